//! Complete HLSL compute program for a descriptor.

use std::collections::HashSet;

use crate::binding::RangeKind;
use crate::config::ShaderConfig;
use crate::descriptor::KernelDescriptor;
use crate::types::Category;

/// `base`, or `base_` repeated until it is not a capture's identifier.
fn block_name(base: String, taken: &HashSet<&str>) -> String {
    let mut name = base;
    while taken.contains(name.as_str()) {
        name.push('_');
    }
    name
}

/// Render the program: declarations in slot order, then the entry point.
///
/// Constant-buffer arrays are declared with
/// [`ShaderConfig::constant_buffer_capacity`] elements; each element starts
/// on its own 16-byte register.
pub fn render_shader(descriptor: &KernelDescriptor, config: &ShaderConfig) -> String {
    let taken: HashSet<&str> = descriptor
        .resources()
        .iter()
        .chain(descriptor.scalars())
        .map(|f| f.shader_name.as_str())
        .collect();

    let mut out: Vec<String> = vec!["#pragma pack_matrix(row_major)".to_string(), String::new()];

    let layout = descriptor.uniform_layout();
    if !layout.entries.is_empty() {
        out.push(format!(
            "cbuffer {} : register(b0)",
            block_name("_uniforms".to_string(), &taken)
        ));
        out.push("{".to_string());
        for (field, entry) in descriptor.scalars().iter().zip(&layout.entries) {
            out.push(format!(
                "    {} {} : packoffset({});",
                field.hlsl_type,
                field.shader_name,
                entry.pack_offset()
            ));
        }
        out.push("};".to_string());
        out.push(String::new());
    }

    let mut buffers = Vec::new();
    for slot in descriptor.slots().iter().filter(|s| !s.is_uniform()) {
        let Some(field) = slot.resource.and_then(|i| descriptor.resources().get(i)) else {
            continue;
        };
        let register = format!("{}{}", RangeKind::of(slot.category).register_class(), slot.index);
        match slot.category {
            Category::ConstantBuffer => {
                out.push(format!(
                    "cbuffer {} : register({})",
                    block_name(format!("_cb_{}", field.shader_name), &taken),
                    register
                ));
                out.push("{".to_string());
                out.push(format!(
                    "    {} {}[{}];",
                    field.hlsl_type, field.shader_name, config.constant_buffer_capacity
                ));
                out.push("};".to_string());
                out.push(String::new());
            }
            _ => buffers.push(format!(
                "{} {} : register({});",
                field.hlsl_type, field.shader_name, register
            )),
        }
    }
    if !buffers.is_empty() {
        out.extend(buffers);
        out.push(String::new());
    }

    let [x, y, z] = config.thread_group;
    out.push(format!("[numthreads({}, {}, {})]", x, y, z));
    out.push(format!(
        "void {}(uint3 {} : SV_DispatchThreadID)",
        config.entry_point,
        descriptor.thread_ids()
    ));
    out.push(descriptor.body().to_string());

    let mut text = out.join("\n");
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{CaptureSource, CapturedField};
    use crate::kernel::{Capture, FieldDecl, Kernel, KernelId, KernelSource};

    struct Sample;

    impl Kernel for Sample {
        fn source() -> KernelSource {
            KernelSource::new("|ids| { }")
        }

        fn fields() -> Vec<FieldDecl> {
            Vec::new()
        }

        fn capture(&self, _: usize) -> Capture<'_> {
            Capture::bool(false)
        }
    }

    fn field(name: &str, hlsl: &str, category: Category, slot: Option<u32>) -> CapturedField {
        CapturedField {
            name: name.to_string(),
            shader_name: name.to_string(),
            host_type: "f32".parse().unwrap(),
            hlsl_type: hlsl.to_string(),
            category,
            slot,
            source: CaptureSource::Instance(0),
        }
    }

    #[test]
    fn test_full_program() {
        let descriptor = KernelDescriptor::new(
            KernelId::of::<Sample>(),
            "{\n    output[ids.x] = input[ids.x] * scale + weights[0].x;\n}".to_string(),
            "ids".to_string(),
            vec![
                field("output", "RWStructuredBuffer<float>", Category::ReadWriteBuffer, Some(0)),
                field("input", "StructuredBuffer<float>", Category::ReadOnlyBuffer, Some(0)),
                field("weights", "float2", Category::ConstantBuffer, Some(1)),
            ],
            vec![field("scale", "float", Category::ScalarOrVector, None)],
        );
        let config = ShaderConfig::default().thread_group(8, 8, 1).constant_buffer_capacity(4);
        let expected = "\
#pragma pack_matrix(row_major)

cbuffer _uniforms : register(b0)
{
    float scale : packoffset(c0.x);
};

cbuffer _cb_weights : register(b1)
{
    float2 weights[4];
};

StructuredBuffer<float> input : register(t0);
RWStructuredBuffer<float> output : register(u0);

[numthreads(8, 8, 1)]
void CSMain(uint3 ids : SV_DispatchThreadID)
{
    output[ids.x] = input[ids.x] * scale + weights[0].x;
}
";
        assert_eq!(render_shader(&descriptor, &config), expected);
    }

    #[test]
    fn test_empty_uniform_block_is_omitted() {
        let descriptor = KernelDescriptor::new(
            KernelId::of::<Sample>(),
            "{\n}".to_string(),
            "tid".to_string(),
            Vec::new(),
            Vec::new(),
        );
        let text = render_shader(&descriptor, &ShaderConfig::default().entry_point("Main"));
        assert!(!text.contains("cbuffer"));
        assert!(text.contains("[numthreads(64, 1, 1)]\nvoid Main(uint3 tid : SV_DispatchThreadID)\n{\n}\n"));
    }

    #[test]
    fn test_block_names_avoid_captures() {
        let descriptor = KernelDescriptor::new(
            KernelId::of::<Sample>(),
            "{\n}".to_string(),
            "ids".to_string(),
            Vec::new(),
            vec![field("_uniforms", "float", Category::ScalarOrVector, None)],
        );
        let text = render_shader(&descriptor, &ShaderConfig::default());
        assert!(text.contains("cbuffer _uniforms_ : register(b0)"));
        assert!(text.contains("float _uniforms : packoffset(c0.x);"));
    }
}
