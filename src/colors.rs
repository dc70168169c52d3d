//! Global colors.

use nu_ansi_term::Color;

/// The attention color.
pub(crate) const ATTENTION_COLOR: Color = Color::Red;

/// The information color.
pub(crate) const INFO_COLOR: Color = Color::Cyan;

/// The color used to colorise paths and URLs.
pub(crate) const PATH_COLOR: Color = Color::LightBlue;

/// The color used for success banners.
pub(crate) const SUCCESS_COLOR: Color = Color::Green;

/// The color used for warnings that do not stop the launcher.
pub(crate) const WARN_COLOR: Color = Color::Yellow;
