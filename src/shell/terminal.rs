const MAX_LINE_LENGTH: usize = 4096;

const BACKSPACE: u8 = 0x7f;
const INTERRUPT: u8 = 0x03;
const BELL: u8 = 0x07;

/// What the shell loop should do after one input byte.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    /// Send these bytes back to the client (may be empty).
    Echo(Vec<u8>),
    /// Ctrl+C: the buffer was discarded; print `^C` and a fresh prompt.
    Interrupt,
    /// Enter: `echo` goes out first, then `line` is evaluated.
    Submit { echo: Vec<u8>, line: Vec<u8> },
}

/// Line editor for the fake shell: buffering, echo, backspace and Ctrl+C.
/// Holds raw bytes; decoding happens once a line is submitted.
#[derive(Debug, Default)]
pub struct LineEditor {
    line_buffer: Vec<u8>,
}

impl LineEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffer(&self) -> &[u8] {
        &self.line_buffer
    }

    pub fn clear(&mut self) {
        self.line_buffer.clear();
    }

    pub fn process_byte(&mut self, byte: u8) -> KeyAction {
        match byte {
            BACKSPACE => {
                if self.line_buffer.pop().is_some() {
                    KeyAction::Echo(b"\x08 \x08".to_vec())
                } else {
                    KeyAction::Echo(Vec::new())
                }
            }
            INTERRUPT => {
                self.line_buffer.clear();
                KeyAction::Interrupt
            }
            b'\r' => {
                let line = std::mem::take(&mut self.line_buffer);
                KeyAction::Submit {
                    echo: b"\r\n".to_vec(),
                    line,
                }
            }
            _ => {
                if self.line_buffer.len() >= MAX_LINE_LENGTH {
                    return KeyAction::Echo(vec![BELL]);
                }
                self.line_buffer.push(byte);
                KeyAction::Echo(vec![byte])
            }
        }
    }
}

/// Turn a submitted buffer into the command line that gets logged and dispatched:
/// CR/LF stripped from both ends, invalid UTF-8 sequences dropped. Valid
/// characters, U+FFFD included, are kept verbatim.
pub fn decode_line(raw: &[u8]) -> String {
    let decoded: String = raw.utf8_chunks().map(|chunk| chunk.valid()).collect();
    decoded.trim_matches(['\r', '\n']).to_string()
}
