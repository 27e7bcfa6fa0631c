//! Declarative description of one round of the routine
//!
//! A plan is plain data: it can be built in code, dumped to YAML, edited and
//! loaded back without touching the matching or dispatch logic.

use crate::config::RunConfig;
use crate::template_matching::Point;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlanError {
    #[error("Invalid plan: {0}")]
    Invalid(String),

    #[error("Failed to read plan {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse plan: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

/// A named group of templates, matched one after another.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    pub templates: Vec<String>,
    /// Tap the center of every template that is found
    #[serde(default = "default_act_on_match")]
    pub act_on_match: bool,
}

fn default_act_on_match() -> bool {
    true
}

impl Stage {
    pub fn new(name: impl Into<String>, templates: &[&str]) -> Self {
        Self {
            name: name.into(),
            templates: templates.iter().map(|t| t.to_string()).collect(),
            act_on_match: true,
        }
    }

    /// Match only, never dispatch.
    pub fn detect_only(name: impl Into<String>, templates: &[&str]) -> Self {
        Self {
            act_on_match: false,
            ..Self::new(name, templates)
        }
    }
}

/// How long to wait. Written in plan files as `click`, `half_click`,
/// `process`, `<n>ms` or `<n>s`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Pause {
    /// Configured inter-action delay
    Click,
    /// Half the inter-action delay, used inside tap sequences
    HalfClick,
    /// Configured inter-stage delay
    Process,
    Millis(u64),
}

impl Pause {
    pub fn resolve(&self, config: &RunConfig) -> Duration {
        match self {
            Pause::Click => config.click_delay(),
            Pause::HalfClick => config.click_delay() / 2,
            Pause::Process => config.process_delay(),
            Pause::Millis(ms) => Duration::from_millis(*ms),
        }
    }
}

impl FromStr for Pause {
    type Err = PlanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || PlanError::Invalid(format!("unknown pause '{s}'"));
        match s {
            "click" => Ok(Pause::Click),
            "half_click" => Ok(Pause::HalfClick),
            "process" => Ok(Pause::Process),
            _ => {
                if let Some(ms) = s.strip_suffix("ms") {
                    ms.trim().parse().map(Pause::Millis).map_err(|_| invalid())
                } else if let Some(secs) = s.strip_suffix('s') {
                    secs.trim()
                        .parse::<u64>()
                        .ok()
                        .and_then(|secs| secs.checked_mul(1000))
                        .map(Pause::Millis)
                        .ok_or_else(invalid)
                } else {
                    Err(invalid())
                }
            }
        }
    }
}

impl TryFrom<String> for Pause {
    type Error = PlanError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Pause> for String {
    fn from(pause: Pause) -> Self {
        pause.to_string()
    }
}

impl fmt::Display for Pause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pause::Click => f.write_str("click"),
            Pause::HalfClick => f.write_str("half_click"),
            Pause::Process => f.write_str("process"),
            Pause::Millis(ms) => write!(f, "{ms}ms"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum PlanStep {
    /// Match each template; tap it when found and the stage acts on matches
    Stage(Stage),
    /// Tap fixed coordinates in order, pausing after each tap
    Taps { points: Vec<Point>, pause: Pause },
    /// Locate one template without tapping it, then tap its center `count` times
    TapFound {
        stage: Stage,
        count: u32,
        pause: Pause,
    },
    Swipe {
        from: Point,
        to: Point,
        duration_ms: u64,
        pause: Pause,
    },
    /// Run `steps` up to `times` times, checking for cancellation before each pass
    Repeat { times: u32, steps: Vec<PlanStep> },
    Wait { pause: Pause },
}

/// One round of the routine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequencePlan {
    pub name: String,
    pub steps: Vec<PlanStep>,
}

/// Confirmation dialogs all share one button position.
const CONFIRM_BUTTON: Point = Point::new(670, 345);

const DEPLOY_TAPS: [Point; 7] = [
    Point::new(670, 345),
    Point::new(978, 170),
    Point::new(412, 584),
    Point::new(1519, 112),
    Point::new(1773, 304),
    Point::new(1833, 1091),
    Point::new(737, 1085),
];

impl SequencePlan {
    /// The round played by default: search, deploy heroes, eight troop
    /// waves, then return home.
    pub fn standard_round() -> Self {
        let mut steps = vec![
            PlanStep::Stage(Stage::new("search", &["jingong.png", "sousuo.png"])),
            PlanStep::Wait {
                pause: Pause::Process,
            },
            PlanStep::Stage(Stage::new("thunder", &["leidian.png"])),
            PlanStep::TapFound {
                stage: Stage::detect_only("bird", &["tianniao.png"]),
                count: 11,
                pause: Pause::Click,
            },
        ];

        for (name, template) in [
            ("queen", "nvhuang.png"),
            ("full king", "manwang.png"),
            ("brave king", "yongwang.png"),
            ("soil", "runtu.png"),
            ("eagle", "cangying.png"),
        ] {
            steps.push(PlanStep::Stage(Stage::new(name, &[template])));
            steps.push(PlanStep::Taps {
                points: vec![CONFIRM_BUTTON],
                pause: Pause::Millis(1000),
            });
        }

        steps.push(PlanStep::Repeat {
            times: 8,
            steps: vec![
                PlanStep::Stage(Stage::new("grassman", &["caoman.png"])),
                PlanStep::Stage(Stage::new("dragon", &["feilong.png"])),
                PlanStep::Taps {
                    points: DEPLOY_TAPS.to_vec(),
                    pause: Pause::HalfClick,
                },
                PlanStep::Wait {
                    pause: Pause::Click,
                },
            ],
        });

        steps.extend([
            PlanStep::Wait {
                pause: Pause::Millis(30_000),
            },
            PlanStep::Stage(Stage::new(
                "go home",
                &["jieshu.png", "queding.png", "huiying.png"],
            )),
            PlanStep::Wait {
                pause: Pause::Process,
            },
        ]);

        Self {
            name: "standard round".to_string(),
            steps,
        }
    }

    pub fn load(path: &Path) -> Result<Self, PlanError> {
        let contents = std::fs::read_to_string(path).map_err(|source| PlanError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&contents)
    }

    pub fn from_yaml(contents: &str) -> Result<Self, PlanError> {
        let plan: Self = serde_yaml_ng::from_str(contents)?;
        plan.validate()?;
        Ok(plan)
    }

    pub fn to_yaml(&self) -> Result<String, PlanError> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        if self.steps.is_empty() {
            return Err(PlanError::Invalid(format!("'{}' has no steps", self.name)));
        }
        validate_steps(&self.steps)
    }

    /// Every template the plan refers to, in first-use order.
    pub fn template_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        collect_templates(&self.steps, &mut names);
        names
    }
}

fn validate_steps(steps: &[PlanStep]) -> Result<(), PlanError> {
    for step in steps {
        match step {
            PlanStep::Stage(stage) if stage.templates.is_empty() => {
                return Err(PlanError::Invalid(format!(
                    "stage '{}' has no templates",
                    stage.name
                )));
            }
            PlanStep::TapFound { stage, .. }
                if stage.templates.len() != 1 || stage.act_on_match =>
            {
                return Err(PlanError::Invalid(format!(
                    "tap_found stage '{}' needs exactly one template and act_on_match: false",
                    stage.name
                )));
            }
            PlanStep::Repeat { times: 0, .. } => {
                return Err(PlanError::Invalid("repeat count must be at least 1".into()));
            }
            PlanStep::Repeat { steps, .. } => {
                if steps.is_empty() {
                    return Err(PlanError::Invalid("repeat block has no steps".into()));
                }
                validate_steps(steps)?;
            }
            _ => {}
        }
    }
    Ok(())
}

fn collect_templates(steps: &[PlanStep], names: &mut Vec<String>) {
    for step in steps {
        match step {
            PlanStep::Stage(stage) | PlanStep::TapFound { stage, .. } => {
                for template in &stage.templates {
                    if !names.contains(template) {
                        names.push(template.clone());
                    }
                }
            }
            PlanStep::Repeat { steps, .. } => collect_templates(steps, names),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_round_is_valid() {
        let plan = SequencePlan::standard_round();
        assert!(plan.validate().is_ok());
        assert_eq!(plan.template_names().len(), 14);
        assert_eq!(plan.template_names()[0], "jingong.png");
    }

    #[test]
    fn test_standard_round_repeat_block() {
        let plan = SequencePlan::standard_round();
        let repeat = plan
            .steps
            .iter()
            .find_map(|step| match step {
                PlanStep::Repeat { times, steps } => Some((*times, steps)),
                _ => None,
            })
            .unwrap();

        assert_eq!(repeat.0, 8);
        match &repeat.1[2] {
            PlanStep::Taps { points, pause } => {
                assert_eq!(points.len(), 7);
                assert_eq!(points[5], Point::new(1833, 1091));
                assert_eq!(*pause, Pause::HalfClick);
            }
            other => panic!("expected taps, got {other:?}"),
        }
    }

    #[test]
    fn test_yaml_round_trip() {
        let plan = SequencePlan::standard_round();
        let yaml = plan.to_yaml().unwrap();
        assert_eq!(SequencePlan::from_yaml(&yaml).unwrap(), plan);
    }

    #[test]
    fn test_hand_written_yaml() {
        let yaml = r#"
name: quick
steps:
  - step: stage
    name: search
    templates: [sousuo.png]
  - step: taps
    points:
      - { x: 10, y: 20 }
    pause: 250ms
  - step: repeat
    times: 2
    steps:
      - step: wait
        pause: 2s
"#;
        let plan = SequencePlan::from_yaml(yaml).unwrap();

        assert_eq!(plan.steps.len(), 3);
        assert_eq!(plan.steps[0], PlanStep::Stage(Stage::new("search", &["sousuo.png"])));
        assert_eq!(
            plan.steps[1],
            PlanStep::Taps {
                points: vec![Point::new(10, 20)],
                pause: Pause::Millis(250),
            }
        );
    }

    #[test]
    fn test_validate_rejects_zero_repeat() {
        let plan = SequencePlan {
            name: "bad".to_string(),
            steps: vec![PlanStep::Repeat {
                times: 0,
                steps: vec![PlanStep::Wait { pause: Pause::Click }],
            }],
        };
        assert!(matches!(plan.validate(), Err(PlanError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_acting_tap_found_stage() {
        let plan = SequencePlan {
            name: "bad".to_string(),
            steps: vec![PlanStep::TapFound {
                stage: Stage::new("bird", &["tianniao.png"]),
                count: 3,
                pause: Pause::Click,
            }],
        };
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_empty_stage_in_nested_repeat() {
        let plan = SequencePlan {
            name: "bad".to_string(),
            steps: vec![PlanStep::Repeat {
                times: 2,
                steps: vec![PlanStep::Stage(Stage::new("empty", &[]))],
            }],
        };
        assert!(plan.validate().is_err());
    }

    #[test]
    fn test_pause_parsing() {
        assert_eq!("click".parse::<Pause>().unwrap(), Pause::Click);
        assert_eq!("half_click".parse::<Pause>().unwrap(), Pause::HalfClick);
        assert_eq!("process".parse::<Pause>().unwrap(), Pause::Process);
        assert_eq!("1500ms".parse::<Pause>().unwrap(), Pause::Millis(1500));
        assert_eq!("30s".parse::<Pause>().unwrap(), Pause::Millis(30_000));
        assert!("soon".parse::<Pause>().is_err());
        // Fits in u64 as seconds, overflows as milliseconds
        assert!("18446744073709552s".parse::<Pause>().is_err());
        assert_eq!(
            "18446744073709551s".parse::<Pause>().unwrap(),
            Pause::Millis(18_446_744_073_709_551_000)
        );
    }

    #[test]
    fn test_plan_with_overflowing_pause_is_rejected() {
        let yaml = "name: long\nsteps:\n  - step: wait\n    pause: 18446744073709552s\n";
        assert!(SequencePlan::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_pause_resolve() {
        let config = RunConfig::default();
        assert_eq!(Pause::Click.resolve(&config), Duration::from_millis(500));
        assert_eq!(Pause::HalfClick.resolve(&config), Duration::from_millis(250));
        assert_eq!(Pause::Process.resolve(&config), Duration::from_secs(5));
        assert_eq!(Pause::Millis(30_000).resolve(&config), Duration::from_secs(30));
    }
}
