//! Per-stream rules for merging scanned GRIB2 messages into one mapping.
//!
//! Scanning a GRIB2 file yields one reference mapping per message. These are
//! combined along the dimensions listed here before the result is compacted
//! by the rewriter. The merge itself is done by the scanning tool; this table
//! only states which dimensions are concatenated and which must be identical
//! across messages.

use crate::combinations::{STREAMS, TYPES};
use crate::refs::ReferenceMapping;

const SURFACE_LIKE: &[&str] = &[
    "depthBelowLandLayer",
    "entireAtmosphere",
    "heightAboveGround",
    "meanSea",
    "surface",
];

/// Which scanned messages take part in a merge stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSelector {
    /// Every scanned message.
    All,
    /// Messages on pressure levels (they carry `isobaricInhPa/.zarray`).
    Isobaric,
    /// Messages not on pressure levels.
    NonIsobaric,
    /// The outputs of all previous stages.
    PreviousStages,
}

impl MessageSelector {
    /// Whether a scanned message is an input of this selector.
    pub fn matches(&self, message: &ReferenceMapping) -> bool {
        let isobaric = message.contains_key("isobaricInhPa/.zarray");
        match self {
            Self::All => true,
            Self::Isobaric => isobaric,
            Self::NonIsobaric => !isobaric,
            Self::PreviousStages => false,
        }
    }

    /// Indices of `messages` selected for this stage.
    pub fn select(&self, messages: &[ReferenceMapping]) -> Vec<usize> {
        messages
            .iter()
            .enumerate()
            .filter(|(_, m)| self.matches(m))
            .map(|(i, _)| i)
            .collect()
    }
}

/// One merge invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeStage {
    pub inputs: MessageSelector,
    pub concat_dims: &'static [&'static str],
    pub identical_dims: &'static [&'static str],
}

/// The merge stages for one `(stream, type)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePlan {
    pub stream: &'static str,
    pub type_: &'static str,
    /// Applied in order; the last stage produces the final mapping.
    pub stages: Vec<MergeStage>,
}

impl MergePlan {
    /// Concatenated dimensions over all stages, first occurrence order.
    pub fn concat_dims(&self) -> Vec<&'static str> {
        let mut dims: Vec<&'static str> = Vec::new();
        for dim in self.stages.iter().flat_map(|s| s.concat_dims.iter()) {
            if !dims.contains(dim) {
                dims.push(dim);
            }
        }
        dims
    }

    /// Whether `name` is a dimension (concatenated or identical) of this plan
    /// rather than a data variable.
    pub fn is_dimension(&self, name: &str) -> bool {
        self.stages.iter().any(|s| {
            s.concat_dims.iter().any(|d| *d == name)
                || s.identical_dims.iter().any(|d| *d == name)
        })
    }
}

/// Merge plan for a stream/type, or None when the product is not merged.
pub fn merge_plan(stream: &str, type_: &str) -> Option<MergePlan> {
    let stream = STREAMS.iter().copied().find(|s| *s == stream)?;
    let type_ = TYPES.iter().copied().find(|t| *t == type_)?;

    let stages = match (stream, type_) {
        ("scda" | "oper", "fc") => vec![
            MergeStage {
                inputs: MessageSelector::Isobaric,
                concat_dims: &["time", "isobaricInhPa"],
                identical_dims: &[],
            },
            MergeStage {
                inputs: MessageSelector::NonIsobaric,
                concat_dims: &["time"],
                identical_dims: SURFACE_LIKE,
            },
            MergeStage {
                inputs: MessageSelector::PreviousStages,
                concat_dims: &["time"],
                identical_dims: SURFACE_LIKE,
            },
        ],
        ("enfo", "ep") => vec![MergeStage {
            inputs: MessageSelector::All,
            concat_dims: &["step", "time"],
            identical_dims: &["heightAboveGround", "isobaricInhPa", "surface", "meanSea"],
        }],
        ("waef", "ef") => vec![MergeStage {
            inputs: MessageSelector::All,
            concat_dims: &["number", "time"],
            identical_dims: &[],
        }],
        ("waef", "ep") => vec![MergeStage {
            inputs: MessageSelector::All,
            concat_dims: &["step", "time"],
            identical_dims: &["meanSea"],
        }],
        ("scwv" | "wave", "fc") => vec![MergeStage {
            inputs: MessageSelector::All,
            concat_dims: &["time"],
            identical_dims: &[],
        }],
        _ => return None,
    };

    Some(MergePlan {
        stream,
        type_,
        stages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wave_forecast_plan() {
        let plan = merge_plan("wave", "fc").unwrap();
        assert_eq!(plan.stream, "wave");
        assert_eq!(plan.stages.len(), 1);
        assert_eq!(plan.concat_dims(), vec!["time"]);
        assert!(plan.is_dimension("time"));
        assert!(!plan.is_dimension("swh"));
    }

    #[test]
    fn test_oper_plan_splits_pressure_levels() {
        let plan = merge_plan("oper", "fc").unwrap();
        assert_eq!(plan.stages.len(), 3);
        assert_eq!(plan.stages[0].inputs, MessageSelector::Isobaric);
        assert_eq!(plan.concat_dims(), vec!["time", "isobaricInhPa"]);
        assert!(plan.is_dimension("meanSea"));
        assert!(plan.is_dimension("isobaricInhPa"));
        assert!(!plan.is_dimension("t"));
    }

    #[test]
    fn test_unmerged_products() {
        assert!(merge_plan("enfo", "ef").is_none());
        assert!(merge_plan("mmsf", "fc").is_none());
        assert!(merge_plan("oper", "ep").is_none());
    }

    #[test]
    fn test_selector_partitions_messages() {
        let mut iso = ReferenceMapping::new();
        iso.insert("isobaricInhPa/.zarray", "{}");
        let surface = ReferenceMapping::new();
        let messages = vec![surface.clone(), iso, surface];

        assert_eq!(MessageSelector::Isobaric.select(&messages), vec![1]);
        assert_eq!(MessageSelector::NonIsobaric.select(&messages), vec![0, 2]);
        assert_eq!(MessageSelector::All.select(&messages), vec![0, 1, 2]);
        assert!(MessageSelector::PreviousStages.select(&messages).is_empty());
    }
}
