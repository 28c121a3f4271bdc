//! Result postprocessors for command responses
//!
//! Management responses arrive as envelopes such as
//! `{"outcome": "success", "result": {...}}`. A postprocessor decides how
//! much of the envelope the caller sees.

use serde::{Deserialize, Serialize};

use converge_model::ValueTree;

use crate::error::{Error, Result};

/// How responses to a query or remediation command are post-processed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultPostprocessor {
    /// Pass responses through unchanged
    #[default]
    Raw,
    /// Fail unless every response with an `outcome` reports success
    Outcome,
    /// As `Outcome`, then unwrap each response to its `result` member
    Result,
}

impl ResultPostprocessor {
    pub fn apply(self, responses: Vec<ValueTree>) -> Result<Vec<ValueTree>> {
        match self {
            Self::Raw => Ok(responses),
            Self::Outcome => {
                for response in &responses {
                    check_outcome(response)?;
                }
                Ok(responses)
            }
            Self::Result => responses
                .into_iter()
                .map(|response| {
                    check_outcome(&response)?;
                    Ok(unwrap_result(response))
                })
                .collect(),
        }
    }
}

fn check_outcome(response: &ValueTree) -> Result<()> {
    let Some(outcome) = response.get_key("outcome") else {
        return Ok(());
    };

    if outcome.as_scalar().and_then(|s| s.as_str()) == Some("success") {
        return Ok(());
    }

    let message = response
        .get_key("failure-description")
        .map(ToString::to_string)
        .unwrap_or_else(|| format!("outcome was {}", outcome));
    Err(Error::ResponseFailed { message })
}

fn unwrap_result(response: ValueTree) -> ValueTree {
    match response {
        ValueTree::Mapping(mut map) if map.contains_key("outcome") => map
            .shift_remove("result")
            .unwrap_or_else(ValueTree::undefined),
        other => other,
    }
}
