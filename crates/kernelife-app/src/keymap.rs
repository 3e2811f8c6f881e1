//! Keyboard bindings and replayable key scripts.

use std::collections::BTreeMap;

use kernelife_core::{ControlCommand, RuleKnob};

/// Maps single characters to control commands.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyMap {
    bindings: BTreeMap<char, ControlCommand>,
}

impl KeyMap {
    /// A map with no bindings.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            bindings: BTreeMap::new(),
        }
    }

    pub fn bind(&mut self, key: char, command: ControlCommand) -> Option<ControlCommand> {
        self.bindings.insert(key, command)
    }

    #[must_use]
    pub fn resolve(&self, key: char) -> Option<&ControlCommand> {
        self.bindings.get(&key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, &ControlCommand)> {
        self.bindings.iter().map(|(&key, command)| (key, command))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl Default for KeyMap {
    /// Rule nudges on `q/w`, `a/s`, `y/x`, `+/-` and display cycling on `f/g`.
    fn default() -> Self {
        let nudge = |knob, delta| ControlCommand::NudgeRule { knob, delta };
        let mut map = Self::empty();
        map.bind('Q', nudge(RuleKnob::DeadMin, 0.1));
        map.bind('W', nudge(RuleKnob::DeadMin, -0.1));
        map.bind('q', nudge(RuleKnob::DeadMin, 0.01));
        map.bind('w', nudge(RuleKnob::DeadMin, -0.01));
        map.bind('a', nudge(RuleKnob::PopMax, 0.01));
        map.bind('s', nudge(RuleKnob::PopMax, -0.01));
        map.bind('y', nudge(RuleKnob::BirthMin, 0.01));
        map.bind('x', nudge(RuleKnob::BirthMin, -0.01));
        map.bind('+', nudge(RuleKnob::LifeMin, 0.01));
        map.bind('-', nudge(RuleKnob::LifeMin, -0.01));
        // Same physical key as '-' on a Czech layout.
        map.bind('ě', nudge(RuleKnob::LifeMin, -0.01));
        map.bind('f', ControlCommand::CycleDisplayMode { step: 1 });
        map.bind('g', ControlCommand::CycleDisplayMode { step: -1 });
        map
    }
}

/// One entry of a key script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptStep {
    /// Press a key at the current tick boundary.
    Key(char),
    /// Let this many ticks run before the next entry.
    Wait(u64),
}

/// Parse a key script: one key per line, `wait <ticks>` to advance (`wait 0` is a
/// no-op), `#` comments.
pub fn parse_script(source: &str) -> Result<Vec<ScriptStep>, ScriptError> {
    let mut steps = Vec::new();
    for (index, raw) in source.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(count) = line.strip_prefix("wait") {
            let ticks = count
                .trim()
                .parse::<u64>()
                .map_err(|_| ScriptError::InvalidWait {
                    line: index + 1,
                    text: line.to_owned(),
                })?;
            steps.push(ScriptStep::Wait(ticks));
            continue;
        }
        let mut chars = line.chars();
        match (chars.next(), chars.next()) {
            (Some(key), None) => steps.push(ScriptStep::Key(key)),
            _ => {
                return Err(ScriptError::NotAKey {
                    line: index + 1,
                    text: line.to_owned(),
                });
            }
        }
    }
    Ok(steps)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScriptError {
    #[error("line {line}: expected a single key, got `{text}`")]
    NotAKey { line: usize, text: String },
    #[error("line {line}: expected `wait <ticks>`, got `{text}`")]
    InvalidWait { line: usize, text: String },
}

/// Steps a script through tick boundaries.
#[derive(Debug, Clone)]
pub struct ScriptPlayer {
    steps: Vec<ScriptStep>,
    cursor: usize,
    waiting: u64,
}

impl ScriptPlayer {
    #[must_use]
    pub fn new(steps: Vec<ScriptStep>) -> Self {
        Self {
            steps,
            cursor: 0,
            waiting: 0,
        }
    }

    /// Keys to press before the next tick.
    pub fn keys_for_tick(&mut self) -> Vec<char> {
        let mut keys = Vec::new();
        if self.waiting > 0 {
            self.waiting -= 1;
            return keys;
        }
        while let Some(step) = self.steps.get(self.cursor) {
            self.cursor += 1;
            match *step {
                ScriptStep::Key(key) => keys.push(key),
                ScriptStep::Wait(0) => {}
                ScriptStep::Wait(ticks) => {
                    self.waiting = ticks - 1;
                    break;
                }
            }
        }
        keys
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.cursor >= self.steps.len() && self.waiting == 0
    }
}
