// tui-devconsole/src/console/session.rs
use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use tracing::debug;

use super::{Evaluator, HistoryBuffer, HistoryStep, NodeRole, RenderNode, ValueNode};
use crate::{InputWidget, TuiWidget, tui_theme};

/// Result of one submitted command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutcome {
    pub command: String,
    /// The evaluated value, or the error's description.
    pub result: Result<ValueNode, String>,
}

impl CommandOutcome {
    pub fn is_error(&self) -> bool {
        self.result.is_err()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionKey {
    Submitted(CommandOutcome),
    Handled,
    Ignored,
}

/// The command field plus its history and the evaluator it submits to.
pub struct CommandSession {
    history: HistoryBuffer,
    input: InputWidget,
    evaluator: Arc<dyn Evaluator>,
}

impl std::fmt::Debug for CommandSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandSession")
            .field("history", &self.history)
            .field("input", &self.input)
            .finish()
    }
}

impl CommandSession {
    pub fn new(evaluator: Arc<dyn Evaluator>) -> Self {
        let input = InputWidget::new()
            .with_prefix("> ")
            .with_prefix_style(tui_theme::prompt_style())
            .with_hint("Enter command...");
        Self {
            history: HistoryBuffer::new(),
            input,
            evaluator,
        }
    }

    pub fn input(&self) -> &InputWidget {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut InputWidget {
        &mut self.input
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    /// Records and evaluates `command`. Blank commands go through too and
    /// come back as whatever the evaluator makes of them.
    pub fn submit(&mut self, command: &str) -> CommandOutcome {
        self.history.push(command);
        let result = self
            .evaluator
            .evaluate(command)
            .map(ValueNode::from_value)
            .map_err(|e| e.to_string());
        if let Err(e) = &result {
            debug!(command, error = %e, "command failed");
        }
        CommandOutcome {
            command: command.to_string(),
            result,
        }
    }

    pub fn key_event(&mut self, key: KeyEvent) -> SessionKey {
        if key.kind != KeyEventKind::Press || !self.input.is_focused() {
            return SessionKey::Ignored;
        }
        match key.code {
            KeyCode::Up => {
                if let Some(entry) = self.history.older() {
                    self.input.set_text(entry);
                }
                SessionKey::Handled
            }
            KeyCode::Down => {
                match self.history.newer() {
                    HistoryStep::Entry(entry) => self.input.set_text(entry),
                    HistoryStep::Exit => self.input.clear(),
                }
                SessionKey::Handled
            }
            _ if self.input.key_event(key) => match self.input.take_submission() {
                Some(command) => SessionKey::Submitted(self.submit(&command)),
                None => SessionKey::Handled,
            },
            _ => SessionKey::Ignored,
        }
    }
}

/// The echoed command: `"> "` followed by the command text.
pub fn render_prompt(command: &str) -> RenderNode {
    RenderNode::block(
        0,
        vec![
            RenderNode::labeled(NodeRole::Prompt, "> "),
            RenderNode::labeled(NodeRole::Command, command),
        ],
    )
}

pub fn render_error(description: &str) -> RenderNode {
    RenderNode::block(0, vec![RenderNode::labeled(NodeRole::Error, description)])
}
