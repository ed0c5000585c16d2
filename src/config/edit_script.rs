use std::collections::BTreeMap;
use std::path::Path;

use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use tracing::debug;

use crate::config::yaml::{get, read_document, scalar_string, string_map};

/// One step of an edit script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptStep {
    Create {
        path: String,
        title: Option<String>,
        vfs_reference: Option<String>,
        properties: BTreeMap<String, String>,
    },
    Edit {
        path: String,
        title: Option<String>,
        vfs_reference: Option<String>,
        properties: Option<BTreeMap<String, String>>,
    },
    Move {
        path: String,
        destination: String,
        position: usize,
    },
    Delete {
        path: String,
    },
    Undo,
    Redo,
    Commit,
    Reset,
    Print,
}

/// A sequence of editor actions replayed against a sitemap.
///
/// ```yaml
/// uri: /sites/default/.sitemap
/// steps:
///   - create: { path: /about/contact, title: Contact }
///   - edit: { path: /about, title: About }
///   - move: { path: /about/contact, to: /contact, position: 0 }
///   - delete: /news
///   - undo
///   - commit
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EditScript {
    pub uri: Option<String>,
    pub steps: Vec<ScriptStep>,
}

impl EditScript {
    pub async fn read(path: &Path) -> Result<Self, ScriptError> {
        let contents = read_document(path).await.context(ReadSnafu {
            file_path: path.display().to_string(),
        })?;
        let script: Self = contents.as_str().try_into()?;
        debug!("Loaded edit script with {} steps", script.steps.len());
        Ok(script)
    }
}

impl TryFrom<&str> for EditScript {
    type Error = ScriptError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let documents = Yaml::load_from_str(contents).context(ParseSnafu)?;
        let top_level = documents
            .first()
            .context(MalformedScriptSnafu)?
            .as_mapping()
            .context(TopLevelNotMapSnafu)?;

        let uri = get(top_level, "uri").and_then(scalar_string);
        let steps = match get(top_level, "steps") {
            Some(value) => value
                .as_sequence()
                .context(StepsNotSequenceSnafu)?
                .iter()
                .enumerate()
                .map(|(idx, node)| parse_step(idx + 1, node))
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        Ok(EditScript { uri, steps })
    }
}

fn parse_step(index: usize, node: &Yaml) -> Result<ScriptStep, ScriptError> {
    if let Some(word) = node.as_str() {
        return match word {
            "undo" => Ok(ScriptStep::Undo),
            "redo" => Ok(ScriptStep::Redo),
            "commit" => Ok(ScriptStep::Commit),
            "reset" => Ok(ScriptStep::Reset),
            "print" => Ok(ScriptStep::Print),
            other => UnknownStepSnafu { index, name: other }.fail(),
        };
    }

    let map = node.as_mapping().context(InvalidStepSnafu { index })?;
    ensure!(map.len() == 1, InvalidStepSnafu { index });
    let (name, body) = map.iter().next().context(InvalidStepSnafu { index })?;
    let name = name.as_str().context(InvalidStepSnafu { index })?;

    match name {
        "create" => {
            let body = step_body(index, body)?;
            Ok(ScriptStep::Create {
                path: required(index, body, "path")?,
                title: get(body, "title").and_then(scalar_string),
                vfs_reference: get(body, "vfs").and_then(scalar_string),
                properties: properties(index, body)?.unwrap_or_default(),
            })
        }
        "edit" => {
            let body = step_body(index, body)?;
            Ok(ScriptStep::Edit {
                path: required(index, body, "path")?,
                title: get(body, "title").and_then(scalar_string),
                vfs_reference: get(body, "vfs").and_then(scalar_string),
                properties: properties(index, body)?,
            })
        }
        "move" => {
            let body = step_body(index, body)?;
            let position = match get(body, "position") {
                Some(Yaml::Value(Scalar::Integer(position))) => usize::try_from(*position)
                    .ok()
                    .context(InvalidFieldSnafu {
                        index,
                        field: "position",
                    })?,
                Some(_) => {
                    return InvalidFieldSnafu {
                        index,
                        field: "position",
                    }
                    .fail();
                }
                None => 0,
            };
            Ok(ScriptStep::Move {
                path: required(index, body, "path")?,
                destination: required(index, body, "to")?,
                position,
            })
        }
        "delete" => {
            let path = match scalar_string(body) {
                Some(path) => path,
                None => required(index, step_body(index, body)?, "path")?,
            };
            Ok(ScriptStep::Delete { path })
        }
        other => UnknownStepSnafu { index, name: other }.fail(),
    }
}

fn step_body<'a, 'input>(
    index: usize,
    body: &'a Yaml<'input>,
) -> Result<&'a LinkedHashMap<Yaml<'input>, Yaml<'input>>, ScriptError> {
    body.as_mapping().context(InvalidStepSnafu { index })
}

fn required(
    index: usize,
    body: &LinkedHashMap<Yaml, Yaml>,
    field: &'static str,
) -> Result<String, ScriptError> {
    get(body, field)
        .and_then(scalar_string)
        .context(MissingFieldSnafu { index, field })
}

fn properties(
    index: usize,
    body: &LinkedHashMap<Yaml, Yaml>,
) -> Result<Option<BTreeMap<String, String>>, ScriptError> {
    get(body, "properties")
        .map(|value| {
            string_map(value).context(InvalidFieldSnafu {
                index,
                field: "properties",
            })
        })
        .transpose()
}

#[derive(Debug, Snafu)]
pub enum ScriptError {
    #[snafu(display("Failed to read the edit script: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Failed to parse the edit script"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Improperly formatted edit script"))]
    MalformedScript,
    #[snafu(display("Top level of the edit script should be a map"))]
    TopLevelNotMap,
    #[snafu(display("'steps' should be a sequence"))]
    StepsNotSequence,
    #[snafu(display("Step {} should be a single-key map or a bare action", index))]
    InvalidStep { index: usize },
    #[snafu(display("Step {} uses the unknown action '{}'", index, name))]
    UnknownStep { index: usize, name: String },
    #[snafu(display("Step {} is missing '{}'", index, field))]
    MissingField { index: usize, field: String },
    #[snafu(display("Step {} has an invalid '{}'", index, field))]
    InvalidField { index: usize, field: String },
}
