//! Convert button state.

/// The buttons that can start a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ButtonId {
    ConvertLink,
    ConvertMp3,
}

impl ButtonId {
    pub const ALL: [ButtonId; 2] = [ButtonId::ConvertLink, ButtonId::ConvertMp3];

    /// Label shown while no conversion is running.
    pub fn original_label(self) -> &'static str {
        match self {
            ButtonId::ConvertLink => "Convert Link",
            ButtonId::ConvertMp3 => "Convert MP3",
        }
    }
}

/// What a button currently does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ButtonMode {
    /// Starts a conversion.
    #[default]
    Idle,
    /// Turned into the stop control for the running conversion.
    Converting,
    /// Stop was pressed; waiting for the cancel request.
    Stopping,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonState {
    pub id: ButtonId,
    pub mode: ButtonMode,
    pub disabled: bool,
}

impl ButtonState {
    fn new(id: ButtonId) -> Self {
        Self {
            id,
            mode: ButtonMode::Idle,
            disabled: false,
        }
    }

    pub fn label(&self) -> &'static str {
        match self.mode {
            ButtonMode::Idle => self.id.original_label(),
            ButtonMode::Converting => "Stop Conversion",
            ButtonMode::Stopping => "Stopping...",
        }
    }
}

/// All convert buttons plus which one, if any, is the active stop control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonBank {
    buttons: Vec<ButtonState>,
    active: Option<ButtonId>,
}

impl Default for ButtonBank {
    fn default() -> Self {
        Self {
            buttons: ButtonId::ALL.iter().map(|&id| ButtonState::new(id)).collect(),
            active: None,
        }
    }
}

impl ButtonBank {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turns `id` into the stop control and disables the others.
    pub fn begin(&mut self, id: ButtonId) {
        self.active = Some(id);
        for button in &mut self.buttons {
            if button.id == id {
                button.mode = ButtonMode::Converting;
                button.disabled = false;
            } else {
                button.mode = ButtonMode::Idle;
                button.disabled = true;
            }
        }
    }

    /// Marks the active stop control as stopping and disables it.
    pub fn stopping(&mut self) {
        if let Some(id) = self.active {
            if let Some(button) = self.buttons.iter_mut().find(|b| b.id == id) {
                button.mode = ButtonMode::Stopping;
                button.disabled = true;
            }
        }
    }

    /// Restores every button to its original label and enables it.
    pub fn reset_all(&mut self) {
        self.active = None;
        for button in &mut self.buttons {
            button.mode = ButtonMode::Idle;
            button.disabled = false;
        }
    }

    /// The button currently acting as the stop control.
    pub fn active(&self) -> Option<ButtonId> {
        self.active
    }

    pub fn get(&self, id: ButtonId) -> &ButtonState {
        // Every id is inserted at construction
        self.buttons
            .iter()
            .find(|b| b.id == id)
            .unwrap_or(&self.buttons[0])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ButtonState> {
        self.buttons.iter()
    }

    /// True when every button is idle and enabled.
    pub fn is_reset(&self) -> bool {
        self.active.is_none()
            && self
                .buttons
                .iter()
                .all(|b| b.mode == ButtonMode::Idle && !b.disabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_begin_disables_other_buttons() {
        let mut bank = ButtonBank::new();
        bank.begin(ButtonId::ConvertLink);

        let link = bank.get(ButtonId::ConvertLink);
        assert_eq!(link.label(), "Stop Conversion");
        assert!(!link.disabled);

        let mp3 = bank.get(ButtonId::ConvertMp3);
        assert_eq!(mp3.label(), "Convert MP3");
        assert!(mp3.disabled);
        assert_eq!(bank.active(), Some(ButtonId::ConvertLink));
    }

    #[test]
    fn test_stopping_and_reset() {
        let mut bank = ButtonBank::new();
        bank.begin(ButtonId::ConvertMp3);
        bank.stopping();
        let mp3 = bank.get(ButtonId::ConvertMp3);
        assert_eq!(mp3.label(), "Stopping...");
        assert!(mp3.disabled);

        bank.reset_all();
        assert!(bank.is_reset());
        assert_eq!(bank.get(ButtonId::ConvertMp3).label(), "Convert MP3");
        assert_eq!(bank.get(ButtonId::ConvertLink).label(), "Convert Link");
    }

    #[test]
    fn test_stopping_without_active_is_noop() {
        let mut bank = ButtonBank::new();
        bank.stopping();
        assert!(bank.is_reset());
    }
}
