//! Status icons for terminal output.

use console::Emoji;

pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK] ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR] ");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "* ");
pub static WARNING: Emoji<'_, '_> = Emoji("⚠️  ", "[!] ");
pub static FOLDER: Emoji<'_, '_> = Emoji("📁 ", "");
