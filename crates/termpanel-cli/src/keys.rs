/// Prefix key: Ctrl-A.
pub const PREFIX: u8 = 0x01;

/// What a chunk of raw stdin turns into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    /// Bytes for the active shell.
    Forward(Vec<u8>),
    NewTerminal,
    Next,
    Previous,
    Kill,
    Quit,
}

/// Splits raw terminal input into shell input and prefix commands.
///
/// `Ctrl-A` followed by `c`, `n`, `p`, `x` or `q` is a command; `Ctrl-A`
/// twice sends a literal `Ctrl-A`. Any other key after the prefix is dropped.
/// The prefix may arrive at the end of one read and its key in the next.
#[derive(Debug, Default)]
pub struct KeyRouter {
    prefix_pending: bool,
}

impl KeyRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_prefix_pending(&self) -> bool {
        self.prefix_pending
    }

    pub fn feed(&mut self, input: &[u8]) -> Vec<KeyAction> {
        let mut actions = Vec::new();
        let mut passthrough = Vec::new();

        for &byte in input {
            if self.prefix_pending {
                self.prefix_pending = false;
                let command = match byte {
                    PREFIX => {
                        passthrough.push(PREFIX);
                        continue;
                    }
                    b'c' => KeyAction::NewTerminal,
                    b'n' => KeyAction::Next,
                    b'p' => KeyAction::Previous,
                    b'x' => KeyAction::Kill,
                    b'q' => KeyAction::Quit,
                    _ => continue,
                };
                if !passthrough.is_empty() {
                    actions.push(KeyAction::Forward(std::mem::take(&mut passthrough)));
                }
                actions.push(command);
            } else if byte == PREFIX {
                self.prefix_pending = true;
            } else {
                passthrough.push(byte);
            }
        }

        if !passthrough.is_empty() {
            actions.push(KeyAction::Forward(passthrough));
        }
        actions
    }
}
