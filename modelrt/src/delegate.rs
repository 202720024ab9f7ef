//! Hardware delegate options.
//!
//! A [`DelegateOptions`] value describes one backend. The runner keeps its
//! own copy for as long as the delegate built from it is alive, and the
//! engine turns it into a native delegate handle.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Backend kind of a delegate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DelegateKind {
    Gpu,
    #[serde(rename = "nnapi")]
    NnApi,
}

impl DelegateKind {
    /// True if the backend allocates tensor storage while it is applied to
    /// the graph. Explicit allocation must be skipped for such backends.
    pub fn allocates_tensors(self) -> bool {
        matches!(self, DelegateKind::Gpu)
    }
}

impl fmt::Display for DelegateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DelegateKind::Gpu => f.write_str("GPU"),
            DelegateKind::NnApi => f.write_str("NNAPI"),
        }
    }
}

/// Options for one delegate, tagged by backend.
///
/// ```yaml
/// - kind: gpu
///   precision_loss_allowed: true
/// - kind: nnapi
///   accelerator_name: qti-dsp
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DelegateOptions {
    Gpu(GpuDelegateOptions),
    #[serde(rename = "nnapi")]
    NnApi(NnApiDelegateOptions),
}

impl DelegateOptions {
    pub fn kind(&self) -> DelegateKind {
        match self {
            DelegateOptions::Gpu(_) => DelegateKind::Gpu,
            DelegateOptions::NnApi(_) => DelegateKind::NnApi,
        }
    }
}

impl From<GpuDelegateOptions> for DelegateOptions {
    fn from(o: GpuDelegateOptions) -> Self {
        DelegateOptions::Gpu(o)
    }
}

impl From<NnApiDelegateOptions> for DelegateOptions {
    fn from(o: NnApiDelegateOptions) -> Self {
        DelegateOptions::NnApi(o)
    }
}

// ---------------------------------------------------------------------------
// GPU
// ---------------------------------------------------------------------------

/// GPU latency/throughput trade-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferencePreference {
    /// Optimize for a single inference with the lowest latency.
    #[default]
    FastSingleAnswer,
    /// Optimize for repeated inference on a stream of inputs.
    SustainedSpeed,
}

impl InferencePreference {
    pub fn label(self) -> &'static str {
        match self {
            InferencePreference::FastSingleAnswer => "Fast Single Answer",
            InferencePreference::SustainedSpeed => "Sustained Speed",
        }
    }
}

/// One ranked GPU inference priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InferencePriority {
    #[default]
    Auto,
    MaxPrecision,
    MinLatency,
    MinMemoryUsage,
}

impl InferencePriority {
    pub fn label(self) -> &'static str {
        match self {
            InferencePriority::Auto => "Auto",
            InferencePriority::MaxPrecision => "Max Precision",
            InferencePriority::MinLatency => "Min Latency",
            InferencePriority::MinMemoryUsage => "Min Memory Usage",
        }
    }
}

fn default_priorities() -> [InferencePriority; 3] {
    [
        InferencePriority::MaxPrecision,
        InferencePriority::Auto,
        InferencePriority::Auto,
    ]
}

/// GPU delegate options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GpuDelegateOptions {
    pub precision_loss_allowed: bool,
    pub inference_preference: InferencePreference,
    pub inference_priorities: [InferencePriority; 3],
}

impl Default for GpuDelegateOptions {
    fn default() -> Self {
        Self {
            precision_loss_allowed: false,
            inference_preference: InferencePreference::FastSingleAnswer,
            inference_priorities: default_priorities(),
        }
    }
}

// ---------------------------------------------------------------------------
// NNAPI
// ---------------------------------------------------------------------------

/// NNAPI execution preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionPreference {
    #[default]
    Undefined,
    LowPower,
    FastSingleAnswer,
    SustainedSpeed,
}

impl ExecutionPreference {
    pub fn label(self) -> &'static str {
        match self {
            ExecutionPreference::Undefined => "Undefined",
            ExecutionPreference::LowPower => "Low Power",
            ExecutionPreference::FastSingleAnswer => "Fast Single Answer",
            ExecutionPreference::SustainedSpeed => "Sustained Speed",
        }
    }
}

/// NNAPI delegate options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NnApiDelegateOptions {
    pub execution_preference: ExecutionPreference,
    pub accelerator_name: Option<String>,
    pub cache_dir: Option<String>,
    pub model_token: Option<String>,
    pub disallow_nnapi_cpu: bool,
    pub allow_fp16: bool,
    pub max_delegated_partitions: i32,
}

impl Default for NnApiDelegateOptions {
    fn default() -> Self {
        Self {
            execution_preference: ExecutionPreference::Undefined,
            accelerator_name: None,
            cache_dir: None,
            model_token: None,
            disallow_nnapi_cpu: true,
            allow_fp16: false,
            max_delegated_partitions: 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_gpu_allocates() {
        assert!(DelegateKind::Gpu.allocates_tensors());
        assert!(!DelegateKind::NnApi.allocates_tensors());
    }

    #[test]
    fn gpu_defaults() {
        let o = GpuDelegateOptions::default();
        assert!(!o.precision_loss_allowed);
        assert_eq!(o.inference_preference, InferencePreference::FastSingleAnswer);
        assert_eq!(o.inference_priorities[0], InferencePriority::MaxPrecision);
    }

    #[test]
    fn nnapi_defaults() {
        let o = NnApiDelegateOptions::default();
        assert_eq!(o.max_delegated_partitions, 3);
        assert!(o.disallow_nnapi_cpu);
    }

    #[test]
    fn tagged_json() {
        let opts: Vec<DelegateOptions> = serde_json::from_str(
            r#"[{"kind":"gpu","precision_loss_allowed":true},
                {"kind":"nnapi","accelerator_name":"dsp","execution_preference":"low_power"}]"#,
        )
        .unwrap();
        assert_eq!(opts[0].kind(), DelegateKind::Gpu);
        match &opts[1] {
            DelegateOptions::NnApi(n) => {
                assert_eq!(n.accelerator_name.as_deref(), Some("dsp"));
                assert_eq!(n.execution_preference, ExecutionPreference::LowPower);
                assert_eq!(n.max_delegated_partitions, 3);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn kind_display() {
        assert_eq!(DelegateKind::Gpu.to_string(), "GPU");
        assert_eq!(DelegateKind::NnApi.to_string(), "NNAPI");
    }
}
