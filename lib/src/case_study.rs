//! Branching case studies: a narrative followed by decision points, each with
//! a handful of options. Progress is one row per (user, case study).

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::data::{CaseStudy, UserCaseStudyInteraction};
use crate::{Error, Result};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DecisionPoint {
    pub question: String,
    #[serde(default)]
    pub context: Option<String>,
    pub options: Vec<DecisionOption>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DecisionOption {
    pub text: String,
    #[serde(default)]
    pub feedback: Option<String>,
    #[serde(default)]
    pub xp: u32,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaseStudyChoice {
    pub decision_point_index: usize,
    pub option_index: usize,
}

impl UserCaseStudyInteraction {
    pub fn start(user_id: &str, case_study_id: Uuid) -> Self {
        Self {
            id: None,
            user_id: user_id.to_owned(),
            case_study_id,
            current_decision_point_index: 0,
            choices: Vec::new(),
            xp_earned: 0,
            completed_at: None,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Records `option_index` at the current decision point and advances.
///
/// Returns the XP the option is worth.
pub fn choose(
    case_study: &CaseStudy,
    progress: &mut UserCaseStudyInteraction,
    option_index: usize,
) -> Result<u32> {
    if progress.is_completed() {
        return Err(Error::InvalidChoice(format!(
            "case study {} is already completed",
            case_study.id
        )));
    }

    let index = progress.current_decision_point_index;
    let point = case_study.decision_points.get(index).ok_or_else(|| {
        Error::InvalidChoice(format!("case study {} has no decision point {index}", case_study.id))
    })?;
    let option = point.options.get(option_index).ok_or_else(|| {
        Error::InvalidChoice(format!("decision point {index} has no option {option_index}"))
    })?;

    progress.choices.push(CaseStudyChoice {
        decision_point_index: index,
        option_index,
    });
    progress.xp_earned += option.xp;
    progress.current_decision_point_index += 1;

    if progress.current_decision_point_index >= case_study.decision_points.len() {
        progress.completed_at = Some(Utc::now());
    }

    Ok(option.xp)
}
