//! Human-readable diagnostics for a [`ModelRunner`]. The format is for
//! people, not parsers.

use std::fmt::Write;

use crate::delegate::{DelegateOptions, GpuDelegateOptions, NnApiDelegateOptions};
use crate::engine::Engine;
use crate::runner::ModelRunner;
use crate::tensor::TensorInfo;

fn yes_no(v: bool) -> &'static str {
    if v { "Yes" } else { "No" }
}

fn or_dash(v: Option<&str>) -> &str {
    v.unwrap_or("-")
}

fn write_tensors(out: &mut String, title: &str, tensors: &[TensorInfo]) {
    let _ = writeln!(out, " {title} Tensor");
    let _ = writeln!(out, " Number / Name / Byte / Type / Size");
    for (i, t) in tensors.iter().enumerate() {
        let _ = writeln!(
            out,
            "  #{i} {} {} {} {}",
            t.name,
            t.byte_size,
            t.element_type,
            t.shape_string()
        );
    }
    out.push('\n');
}

fn write_gpu(out: &mut String, o: &GpuDelegateOptions) {
    let [p1, p2, p3] = o.inference_priorities;
    let _ = writeln!(out, "GPU delegate Options:");
    let _ = writeln!(out, "    Precision Loss Allowed: {}", yes_no(o.precision_loss_allowed));
    let _ = writeln!(out, "    Inference Preference: {}", o.inference_preference.label());
    let _ = writeln!(
        out,
        "    Inference Priority: {}, {}, {}",
        p1.label(),
        p2.label(),
        p3.label()
    );
}

fn write_nnapi(out: &mut String, o: &NnApiDelegateOptions) {
    let _ = writeln!(out, "NNAPI delegate Options:");
    let _ = writeln!(out, "    Execution Preference: {}", o.execution_preference.label());
    let _ = writeln!(out, "    Accelerator Name: {}", or_dash(o.accelerator_name.as_deref()));
    let _ = writeln!(out, "    Cache Dir: {}", or_dash(o.cache_dir.as_deref()));
    let _ = writeln!(out, "    Model Token: {}", or_dash(o.model_token.as_deref()));
    let _ = writeln!(out, "    Disallow NNAPI CPU: {}", yes_no(o.disallow_nnapi_cpu));
    let _ = writeln!(out, "    Max Delegated Partitions: {}", o.max_delegated_partitions);
}

impl<E: Engine> ModelRunner<E> {
    /// Describes every input and output tensor: index, name, byte size,
    /// element type and shape.
    pub fn summary(&self) -> String {
        if !self.is_built() {
            return "Interpreter is not built.".to_string();
        }
        let mut out = String::new();
        write_tensors(&mut out, "Input", &self.input_tensors());
        write_tensors(&mut out, "Output", &self.output_tensors());
        out
    }

    /// Describes the thread count and the attached delegates, in attach
    /// order.
    pub fn summarize_options(&self) -> String {
        let mut out = String::new();
        match self.num_threads {
            Some(n) => {
                let _ = writeln!(out, "Num Threads: {n}");
            }
            None => out.push_str("Num Threads: default\n"),
        }
        let _ = writeln!(out, "Delegates: {}", self.delegates.len());
        for options in self.delegate_options() {
            out.push('\n');
            match options {
                DelegateOptions::Gpu(o) => write_gpu(&mut out, o),
                DelegateOptions::NnApi(o) => write_nnapi(&mut out, o),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tensor::ElementType;

    #[test]
    fn tensor_table() {
        let mut out = String::new();
        let tensors = vec![
            TensorInfo {
                name: "image".into(),
                element_type: ElementType::Float32,
                byte_size: 24,
                shape: vec![1, 2, 3],
            },
            TensorInfo {
                name: "scale".into(),
                element_type: ElementType::Int32,
                byte_size: 4,
                shape: vec![],
            },
        ];
        write_tensors(&mut out, "Input", &tensors);
        assert_eq!(
            out,
            " Input Tensor\n Number / Name / Byte / Type / Size\n  #0 image 24 FLOAT32 1x2x3\n  #1 scale 4 INT32 none\n\n"
        );
    }

    #[test]
    fn nnapi_missing_strings_render_as_dash() {
        let mut out = String::new();
        write_nnapi(&mut out, &NnApiDelegateOptions::default());
        assert!(out.contains("Accelerator Name: -\n"));
        assert!(out.contains("Disallow NNAPI CPU: Yes\n"));
        assert!(out.contains("Max Delegated Partitions: 3\n"));
    }

    #[test]
    fn gpu_priorities_in_rank_order() {
        let mut out = String::new();
        write_gpu(&mut out, &GpuDelegateOptions::default());
        assert!(out.contains("Inference Priority: Max Precision, Auto, Auto\n"));
        assert!(out.contains("Precision Loss Allowed: No\n"));
    }
}
