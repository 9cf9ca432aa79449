//! Inline text-entry forms.
//!
//! The join and chat forms edit on the status line. While a form is open
//! it owns the keyboard (the router is suspended), so game keys cannot
//! leak into text fields or the other way around.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};

/// Longest accepted field value; keeps the status line renderable.
const MAX_FIELD_LEN: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    Join,
    Chat,
}

#[derive(Debug)]
struct Field {
    label: &'static str,
    value: String,
}

/// What a key did to the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormOutcome {
    Pending,
    Cancelled,
    Submitted,
}

/// A status-line form: a fixed sequence of fields, one active at a time.
/// Enter advances and submits from the last field; Tab cycles; Esc
/// cancels.
#[derive(Debug)]
pub struct Form {
    kind: FormKind,
    fields: Vec<Field>,
    active: usize,
}

impl Form {
    /// The join form, prefilled with the current session parameters.
    pub fn join(instance: &str, name: &str, team: &str, enter: &str) -> Self {
        Self {
            kind: FormKind::Join,
            fields: vec![
                Field {
                    label: "instance",
                    value: instance.to_string(),
                },
                Field {
                    label: "name",
                    value: name.to_string(),
                },
                Field {
                    label: "team",
                    value: team.to_string(),
                },
                Field {
                    label: "enter",
                    value: enter.to_string(),
                },
            ],
            active: 0,
        }
    }

    /// The single-line chat form.
    pub fn chat() -> Self {
        Self {
            kind: FormKind::Chat,
            fields: vec![Field {
                label: "message",
                value: String::new(),
            }],
            active: 0,
        }
    }

    pub fn kind(&self) -> FormKind {
        self.kind
    }

    pub fn field_value(&self, index: usize) -> &str {
        &self.fields[index].value
    }

    /// Feed one key event to the form.
    pub fn handle_key(&mut self, event: &KeyEvent) -> FormOutcome {
        if event.kind == KeyEventKind::Release {
            return FormOutcome::Pending;
        }

        match event.code {
            KeyCode::Esc => FormOutcome::Cancelled,
            KeyCode::Enter => {
                if self.active + 1 < self.fields.len() {
                    self.active += 1;
                    FormOutcome::Pending
                } else {
                    FormOutcome::Submitted
                }
            }
            KeyCode::Tab => {
                self.active = (self.active + 1) % self.fields.len();
                FormOutcome::Pending
            }
            KeyCode::BackTab => {
                self.active = (self.active + self.fields.len() - 1) % self.fields.len();
                FormOutcome::Pending
            }
            KeyCode::Backspace => {
                self.fields[self.active].value.pop();
                FormOutcome::Pending
            }
            KeyCode::Char(ch) if !ch.is_control() => {
                let value = &mut self.fields[self.active].value;
                if value.len() < MAX_FIELD_LEN {
                    value.push(ch);
                }
                FormOutcome::Pending
            }
            _ => FormOutcome::Pending,
        }
    }

    /// Render the form into a status line, marking the active field.
    pub fn status_line(&self) -> String {
        let title = match self.kind {
            FormKind::Join => "join",
            FormKind::Chat => "chat",
        };

        let mut line = format!("{}>", title);
        for (i, field) in self.fields.iter().enumerate() {
            let marker = if i == self.active { "_" } else { "" };
            line.push_str(&format!(" {}:{}{}", field.label, field.value, marker));
        }
        line.push_str("  (enter=next/ok, tab=field, esc=cancel)");
        line
    }
}
