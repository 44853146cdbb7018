//! Helper collaborators for shooter_core

/// An indicator that ignores every request; the default when none is given.
pub struct NoopIndicator;

impl shooter_traits::Indicator for NoopIndicator {
    fn show_idle(&mut self) {}
    fn show_pre_shoot(&mut self) {}
    fn show_shot_fired(&mut self) {}
    fn show_post_shoot_cleanup(&mut self) {}
}
