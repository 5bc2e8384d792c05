/// 進度指示的步驟數。 / Number of markers on the progress indicator.
pub const PROGRESS_STEPS: u8 = 3;

/// 進度步驟 0..=3。 / Step counter: 0 nothing selected, 1 source, 2 target, 3 translating or done.
///
/// Steps are assigned, never incremented, so order of selection does not matter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ProgressState(u8);

impl ProgressState {
    pub const IDLE: ProgressState = ProgressState(0);
    pub const SOURCE_CHOSEN: ProgressState = ProgressState(1);
    pub const TARGET_CHOSEN: ProgressState = ProgressState(2);
    pub const TRANSLATING: ProgressState = ProgressState(3);

    pub fn new(step: u8) -> Self {
        Self(step.min(PROGRESS_STEPS))
    }

    pub fn step(&self) -> u8 {
        self.0
    }

    /// 每個標記是否點亮。 / Marker `i` is active iff `i < step`.
    pub fn markers(&self) -> [bool; PROGRESS_STEPS as usize] {
        let mut markers = [false; PROGRESS_STEPS as usize];
        for (index, marker) in markers.iter_mut().enumerate() {
            *marker = index < self.0 as usize;
        }
        markers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_light_up_below_the_step() {
        assert_eq!(ProgressState::IDLE.markers(), [false, false, false]);
        assert_eq!(ProgressState::TARGET_CHOSEN.markers(), [true, true, false]);
        assert_eq!(ProgressState::TRANSLATING.markers(), [true, true, true]);
    }

    #[test]
    fn steps_are_clamped() {
        assert_eq!(ProgressState::new(9), ProgressState::TRANSLATING);
    }
}
