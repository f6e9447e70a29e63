//! Edit scripts: the JSON replacement for pointer and toolbar events.
//!
//! A script is either a bare array of commands or an object that may
//! also carry a session config:
//!
//! ```json
//! [{"op": "fill", "x": 50, "y": 50, "color": "#CD0000"}, {"op": "undo"}]
//! ```
//!
//! ```json
//! {"config": {"fill": {"tolerance": 60}}, "commands": [{"op": "fill", "x": 5, "y": 5}]}
//! ```

use colorbook_core::{Command, SessionConfig};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScriptFile {
    Bare(Vec<Command>),
    Full {
        #[serde(default)]
        config: Option<SessionConfig>,
        commands: Vec<Command>,
    },
}

/// A parsed edit script.
#[derive(Debug, Default)]
pub struct Script {
    pub config: Option<SessionConfig>,
    pub commands: Vec<Command>,
}

impl Script {
    /// Parse a script from JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        Ok(match serde_json::from_str(text)? {
            ScriptFile::Bare(commands) => Self {
                config: None,
                commands,
            },
            ScriptFile::Full { config, commands } => Self { config, commands },
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use colorbook_core::Rgba;

    use super::*;

    #[test]
    fn bare_array_parses() {
        let script = Script::from_json(r##"[{"op": "fill", "x": 1, "y": 2, "color": "#CD0000"}, {"op": "undo"}]"##)
            .unwrap();
        assert!(script.config.is_none());
        assert_eq!(script.commands.len(), 2);
        assert_eq!(
            script.commands[0],
            Command::Fill {
                x: 1,
                y: 2,
                color: Some(Rgba::rgb(0xCD, 0, 0)),
                tolerance: None,
            }
        );
    }

    #[test]
    fn object_with_config_parses() {
        let script = Script::from_json(
            r#"{"config": {"fill": {"tolerance": 60}}, "commands": [{"op": "redo"}]}"#,
        )
        .unwrap();
        assert_eq!(script.config.unwrap().fill.tolerance, 60);
        assert_eq!(script.commands, vec![Command::Redo]);
    }

    #[test]
    fn unknown_op_is_rejected() {
        assert!(Script::from_json(r#"[{"op": "explode"}]"#).is_err());
    }
}
