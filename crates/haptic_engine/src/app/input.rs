#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    RaiseMax,
    LowerMax,
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Pressed,
    Repeat,
    Released,
}

const ACTION_COUNT: usize = 3;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }
}

impl InputAction {
    const fn index(self) -> usize {
        match self {
            InputAction::RaiseMax => 0,
            InputAction::LowerMax => 1,
            InputAction::Quit => 2,
        }
    }
}

/// Turns raw key transitions into edge-triggered actions. A held key fires
/// once; auto-repeat never fires. Backends that never report releases
/// (plain terminals) get one action per press.
#[derive(Debug, Clone, Default)]
pub struct InputCollector {
    states: ActionStates,
    tracks_releases: bool,
}

impl InputCollector {
    pub fn new(tracks_releases: bool) -> Self {
        Self {
            states: ActionStates::default(),
            tracks_releases,
        }
    }

    /// Returns the action when this transition is a fresh press.
    pub fn handle_key(&mut self, action: InputAction, state: KeyState) -> Option<InputAction> {
        match state {
            KeyState::Pressed => {
                let fresh = !self.states.is_down(action);
                if self.tracks_releases {
                    self.states.set(action, true);
                }
                fresh.then_some(action)
            }
            KeyState::Repeat => None,
            KeyState::Released => {
                self.states.set(action, false);
                None
            }
        }
    }
}
