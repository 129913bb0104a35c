//! Static lookup tables for event kinds
//!
//! Every [`EventKind`] maps to:
//! - a coarse wire code sent to the collection endpoint as `eventType`
//! - a finer code used when naming events for the secondary sink
//! - a display-name template with an `@name` placeholder

use crate::types::EventKind;

/// Placeholder substituted by [`EventKind::display_name`]
pub const NAME_PLACEHOLDER: &str = "@name";

impl EventKind {
    /// Coarse category for the transport payload
    pub fn wire_code(&self) -> &'static str {
        match self {
            EventKind::AppForeground | EventKind::PageEnter | EventKind::Show => "in",
            EventKind::AppBackground | EventKind::PageExit | EventKind::Close => "out",
            EventKind::Click | EventKind::ValueChange => "click",
            EventKind::Load | EventKind::StateChange => "load",
            EventKind::Error => "error",
        }
    }

    /// Finer category for the secondary sink. Empty for state changes.
    pub fn alt_wire_code(&self) -> &'static str {
        match self {
            EventKind::AppForeground | EventKind::PageEnter | EventKind::Show => "in",
            EventKind::AppBackground | EventKind::PageExit | EventKind::Close => "out",
            EventKind::Click => "clk",
            EventKind::ValueChange => "vc",
            EventKind::Load => "ld",
            EventKind::StateChange => "",
            EventKind::Error => "err",
        }
    }

    pub fn display_template(&self) -> &'static str {
        match self {
            EventKind::AppForeground | EventKind::AppBackground => "@name",
            EventKind::PageEnter => "进入-【@name】",
            EventKind::PageExit => "离开-【@name】",
            EventKind::Click => "点击-@name",
            EventKind::ValueChange => "值改变-@name",
            EventKind::Load => "加载-@name",
            EventKind::Show => "显示-【@name】",
            EventKind::Close => "关闭-【@name】",
            EventKind::StateChange => "状态-@name",
            EventKind::Error => "错误-@name",
        }
    }

    /// Human-readable event name for `subject`
    pub fn display_name(&self, subject: &str) -> String {
        self.display_template().replace(NAME_PLACEHOLDER, subject)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_codes() {
        assert_eq!(EventKind::PageEnter.wire_code(), "in");
        assert_eq!(EventKind::PageExit.wire_code(), "out");
        assert_eq!(EventKind::ValueChange.wire_code(), "click");
        assert_eq!(EventKind::StateChange.wire_code(), "load");
        assert_eq!(EventKind::Error.wire_code(), "error");
    }

    #[test]
    fn test_wire_codes_stay_in_allowed_set() {
        for kind in EventKind::ALL {
            assert!(["in", "out", "click", "load", "error"].contains(&kind.wire_code()));
        }
    }

    #[test]
    fn test_alt_wire_codes() {
        assert_eq!(EventKind::Click.alt_wire_code(), "clk");
        assert_eq!(EventKind::ValueChange.alt_wire_code(), "vc");
        assert_eq!(EventKind::Load.alt_wire_code(), "ld");
        assert_eq!(EventKind::StateChange.alt_wire_code(), "");
    }

    #[test]
    fn test_every_template_has_placeholder() {
        for kind in EventKind::ALL {
            assert!(kind.display_template().contains(NAME_PLACEHOLDER), "{kind}");
        }
    }

    #[test]
    fn test_display_name() {
        assert_eq!(EventKind::PageEnter.display_name("首页"), "进入-【首页】");
        assert_eq!(EventKind::Click.display_name("login"), "点击-login");
        assert_eq!(EventKind::AppForeground.display_name("前台"), "前台");
    }
}
