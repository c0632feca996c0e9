//! Generation pipeline step state machine.
//!
//! A job advances through a strict step order with two optional skips:
//!
//! ```text
//! Outline -> Content -> Humanize -> [Seo] -> Finalize -> [Image] -> Complete
//! ```
//!
//! Which optional steps run is decided once per job by [`StepPlan`],
//! derived from the job's options and the configured humanization
//! intensity. The transition table is a total function over the enum,
//! so an unhandled step is a compile error rather than a runtime
//! surprise.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Humanization intensity (0-10) below which the humanize step is
/// skipped entirely.
pub const HUMANIZE_MIN_INTENSITY: u8 = 3;

// ---------------------------------------------------------------------------
// Step enum
// ---------------------------------------------------------------------------

/// One stage of the generation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStep {
    Outline,
    Content,
    Humanize,
    Seo,
    Finalize,
    Image,
    Complete,
}

impl GenerationStep {
    /// Stable wire/storage name for this step.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Outline => "outline",
            Self::Content => "content",
            Self::Humanize => "humanize",
            Self::Seo => "seo",
            Self::Finalize => "finalize",
            Self::Image => "image",
            Self::Complete => "complete",
        }
    }

    /// Parse a stored step name.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "outline" => Ok(Self::Outline),
            "content" => Ok(Self::Content),
            "humanize" => Ok(Self::Humanize),
            "seo" => Ok(Self::Seo),
            "finalize" => Ok(Self::Finalize),
            "image" => Ok(Self::Image),
            "complete" => Ok(Self::Complete),
            other => Err(CoreError::Validation(format!("Unknown step '{other}'"))),
        }
    }

    /// The step whose stored output must exist before this step may run.
    ///
    /// `Outline` has no prerequisite; `Image` requires that `Finalize`
    /// has produced a content entity, which the engine checks through
    /// the job's `content_ref` rather than a data key.
    pub fn prerequisite(self) -> Option<GenerationStep> {
        match self {
            Self::Outline => None,
            Self::Content => Some(Self::Outline),
            Self::Humanize => Some(Self::Content),
            Self::Seo => Some(Self::Content),
            Self::Finalize => Some(Self::Content),
            Self::Image => Some(Self::Finalize),
            Self::Complete => None,
        }
    }

    /// Whether this step calls the text-generation endpoint.
    pub fn is_text_step(self) -> bool {
        matches!(self, Self::Outline | Self::Content | Self::Humanize | Self::Seo)
    }
}

impl std::fmt::Display for GenerationStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Step plan
// ---------------------------------------------------------------------------

/// Which optional steps are enabled for one job. Decided at job
/// creation and stored with the job so a settings change mid-flight
/// cannot reroute it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepPlan {
    pub humanize: bool,
    pub seo: bool,
    pub image: bool,
}

impl StepPlan {
    /// Derive the plan from the configured humanization intensity and
    /// the SEO / image toggles.
    pub fn new(humanize_intensity: u8, seo_enabled: bool, image_enabled: bool) -> Self {
        Self {
            humanize: humanize_intensity >= HUMANIZE_MIN_INTENSITY,
            seo: seo_enabled,
            image: image_enabled,
        }
    }
}

// ---------------------------------------------------------------------------
// Transition table
// ---------------------------------------------------------------------------

/// The step that follows `step` under `plan`, or `None` from the
/// terminal step.
///
/// Failures do not appear here: a failed step leaves the job in an
/// error status without advancing, so the table only encodes forward
/// motion.
pub fn next_step(step: GenerationStep, plan: StepPlan) -> Option<GenerationStep> {
    use GenerationStep::*;
    match step {
        Outline => Some(Content),
        Content => Some(if plan.humanize {
            Humanize
        } else if plan.seo {
            Seo
        } else {
            Finalize
        }),
        Humanize => Some(if plan.seo { Seo } else { Finalize }),
        Seo => Some(Finalize),
        Finalize => Some(if plan.image { Image } else { Complete }),
        Image => Some(Complete),
        Complete => None,
    }
}

/// The first step of every job.
pub fn first_step() -> GenerationStep {
    GenerationStep::Outline
}

#[cfg(test)]
mod tests {
    use super::*;
    use GenerationStep::*;

    const FULL: StepPlan = StepPlan {
        humanize: true,
        seo: true,
        image: true,
    };

    const BARE: StepPlan = StepPlan {
        humanize: false,
        seo: false,
        image: false,
    };

    // -----------------------------------------------------------------------
    // Transition table
    // -----------------------------------------------------------------------

    #[test]
    fn full_plan_walks_every_step() {
        let mut step = first_step();
        let mut order = vec![step];
        while let Some(next) = next_step(step, FULL) {
            order.push(next);
            step = next;
        }
        assert_eq!(
            order,
            vec![Outline, Content, Humanize, Seo, Finalize, Image, Complete]
        );
    }

    #[test]
    fn bare_plan_skips_all_optional_steps() {
        let mut step = first_step();
        let mut order = vec![step];
        while let Some(next) = next_step(step, BARE) {
            order.push(next);
            step = next;
        }
        assert_eq!(order, vec![Outline, Content, Finalize, Complete]);
    }

    #[test]
    fn content_skips_to_seo_without_humanize() {
        let plan = StepPlan {
            humanize: false,
            seo: true,
            image: false,
        };
        assert_eq!(next_step(Content, plan), Some(Seo));
    }

    #[test]
    fn humanize_skips_to_finalize_without_seo() {
        let plan = StepPlan {
            humanize: true,
            seo: false,
            image: false,
        };
        assert_eq!(next_step(Humanize, plan), Some(Finalize));
    }

    #[test]
    fn finalize_goes_to_image_when_enabled() {
        assert_eq!(next_step(Finalize, FULL), Some(Image));
    }

    #[test]
    fn complete_is_terminal() {
        assert_eq!(next_step(Complete, FULL), None);
    }

    // -----------------------------------------------------------------------
    // Step plan derivation
    // -----------------------------------------------------------------------

    #[test]
    fn intensity_below_threshold_skips_humanize() {
        assert!(!StepPlan::new(HUMANIZE_MIN_INTENSITY - 1, true, true).humanize);
    }

    #[test]
    fn intensity_at_threshold_keeps_humanize() {
        assert!(StepPlan::new(HUMANIZE_MIN_INTENSITY, true, true).humanize);
    }

    // -----------------------------------------------------------------------
    // Prerequisites
    // -----------------------------------------------------------------------

    #[test]
    fn outline_has_no_prerequisite() {
        assert_eq!(Outline.prerequisite(), None);
    }

    #[test]
    fn content_requires_outline() {
        assert_eq!(Content.prerequisite(), Some(Outline));
    }

    #[test]
    fn seo_and_finalize_require_content() {
        assert_eq!(Seo.prerequisite(), Some(Content));
        assert_eq!(Finalize.prerequisite(), Some(Content));
    }

    // -----------------------------------------------------------------------
    // Names round-trip
    // -----------------------------------------------------------------------

    #[test]
    fn step_names_round_trip() {
        for step in [Outline, Content, Humanize, Seo, Finalize, Image, Complete] {
            assert_eq!(GenerationStep::parse(step.as_str()).unwrap(), step);
        }
    }

    #[test]
    fn unknown_step_name_rejected() {
        assert!(GenerationStep::parse("publish").is_err());
    }
}
