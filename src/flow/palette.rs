use rand::seq::SliceRandom;

/// Icon names known to the frontend icon set.
pub const ICONS: [&str; 10] = [
    "sparkles", "rocket", "owl", "compass", "leaf", "bolt", "book", "palette", "globe", "gem",
];

/// Accent colors, one per new bot.
pub const COLORS: [&str; 8] = [
    "#6366F1", "#06B6D4", "#10B981", "#F59E0B", "#EF4444", "#8B5CF6", "#EC4899", "#14B8A6",
];

/// Tool set every flow-created bot starts with.
pub const DEFAULT_TOOLS: [&str; 3] = ["web_search", "documents", "calculator"];

pub fn random_icon() -> String {
    let mut rng = rand::thread_rng();
    ICONS.choose(&mut rng).unwrap_or(&ICONS[0]).to_string()
}

pub fn random_color() -> String {
    let mut rng = rand::thread_rng();
    COLORS.choose(&mut rng).unwrap_or(&COLORS[0]).to_string()
}

pub fn default_tools() -> Vec<String> {
    DEFAULT_TOOLS.iter().map(|s| s.to_string()).collect()
}
