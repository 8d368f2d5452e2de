//! Every placeholder rule, scalar method and intrinsic, driven through the
//! binder and rewriter from kernel source.

use kernelc::extract::decompile;
use kernelc::rewrite::placeholder::{
    Member, Placeholder, Receiver, INTRINSICS, PLACEHOLDERS, SCALAR_METHODS,
};
use kernelc::rewrite::rewrite;
use kernelc::{Capture, FieldDecl, HlslTypeTable, Kernel, KernelId, KernelSource};

struct Scratch;

impl Kernel for Scratch {
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

fn fields() -> Vec<FieldDecl> {
    vec![
        FieldDecl::instance("input", "ReadOnlyBuffer<f32>"),
        FieldDecl::instance("factor", "f32"),
        FieldDecl::instance("count", "u32"),
        FieldDecl::instance("offset", "Float4"),
        FieldDecl::instance("transform", "Float4x4"),
        FieldDecl::instance("mask", "Bool4"),
        FieldDecl::instance("bits", "UInt4"),
    ]
}

/// HLSL text of `expr` as the initializer of a local.
fn lower(expr: &str) -> String {
    let source: &'static str = Box::leak(format!("|ids| {{ let v = {}; }}", expr).into_boxed_str());
    let body = match decompile(KernelId::of::<Scratch>(), source, fields(), Vec::new()) {
        Ok(body) => body,
        Err(err) => panic!("`{}` does not bind:\n{}", expr, err.report()),
    };
    let text = match rewrite(&body, &HlslTypeTable) {
        Ok(out) => out.text,
        Err(diags) => panic!("`{}` does not rewrite: {:?}", expr, diags),
    };
    let line = text
        .lines()
        .find(|l| l.contains(" v = "))
        .unwrap_or_else(|| panic!("no initializer in {}", text));
    let start = line.find(" v = ").unwrap() + 5;
    line[start..line.len() - 1].to_string()
}

/// A host expression exercising `rule`, and the HLSL it must become.
fn sample(rule: &Placeholder) -> Option<(&'static str, &'static str)> {
    let case = match (rule.receiver, rule.member) {
        (Receiver::Buffer, Member::Index) => ("input[ids.x]", "input[ids.x]"),
        (Receiver::Vector, Member::Index) => ("offset[2]", "offset[2]"),
        (Receiver::Matrix, Member::Index) => ("transform[1]", "transform[1]"),
        (Receiver::Matrix, Member::MatrixSwizzle) => (
            "transform[(MatrixIndex::M11, MatrixIndex::M22)]",
            "transform._m00_m11",
        ),
        (Receiver::Matrix, Member::Element) => ("transform.m34()", "transform._m23"),
        (Receiver::Vector, Member::Swizzle) => ("offset.wzyx()", "offset.wzyx"),
        (Receiver::Vector, Member::Component) => ("offset.y", "offset.y"),
        (Receiver::ThreadIds, Member::Component) => ("ids.z", "ids.z"),
        (Receiver::Vector, Member::Neg) => ("-offset", "-offset"),
        (Receiver::Matrix, Member::Neg) => ("-transform", "-transform"),
        (Receiver::Vector, Member::Not) => ("!mask", "!mask"),
        (Receiver::Vector, Member::Complement) => ("!bits", "~bits"),
        (Receiver::Vector, Member::Arith) => ("offset * offset", "offset * offset"),
        (Receiver::Matrix, Member::Arith) => ("transform + transform", "transform + transform"),
        (Receiver::Vector, Member::Compare) => ("offset < offset", "offset < offset"),
        (Receiver::Vector, Member::Bitwise) => ("bits ^ bits", "bits ^ bits"),
        (Receiver::Scalar, Member::Method) => ("factor.powf(2.0)", "pow(factor, 2.0)"),
        (Receiver::Hlsl, Member::Intrinsic) => (
            "Hlsl::lerp(offset, offset, factor)",
            "lerp(offset, offset, factor)",
        ),
        (Receiver::Constructor, Member::New) => ("Float2::new(factor, 1.0)", "float2(factor, 1.0)"),
        (Receiver::Constructor, Member::Splat) => ("UInt3::splat(count)", "(uint3)(count)"),
        _ => return None,
    };
    Some(case)
}

#[test]
fn test_every_rule_rewrites_from_source() {
    for rule in PLACEHOLDERS {
        let (host, hlsl) =
            sample(rule).unwrap_or_else(|| panic!("no sample for {:?}/{:?}", rule.receiver, rule.member));
        assert_eq!(lower(host), hlsl, "{:?}/{:?}", rule.receiver, rule.member);
    }
}

#[test]
fn test_every_scalar_method() {
    for method in SCALAR_METHODS {
        let args = vec!["factor"; method.arity + 1].join(", ");
        let host = match method.arity {
            0 => format!("factor.{}()", method.name),
            n => format!("factor.{}({})", method.name, vec!["factor"; n].join(", ")),
        };
        assert_eq!(lower(&host), format!("{}({})", method.hlsl, args), "{}", method.name);
    }
}

#[test]
fn test_integer_methods_accept_integers_only_where_allowed() {
    for method in SCALAR_METHODS.iter().filter(|m| m.integers) {
        let host = match method.arity {
            0 => format!("count.{}()", method.name),
            n => format!("count.{}({})", method.name, vec!["count"; n].join(", ")),
        };
        assert!(lower(&host).starts_with(method.hlsl), "{}", method.name);
    }
    let err = decompile(
        KernelId::of::<Scratch>(),
        "|ids| { let v = count.sqrt(); }",
        fields(),
        Vec::new(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("no method named `sqrt`"));
}

#[test]
fn test_every_intrinsic() {
    for intrinsic in INTRINSICS {
        let (host, hlsl) = if intrinsic.name == "mul" {
            (
                "Hlsl::mul(transform, offset)".to_string(),
                "mul(transform, offset)".to_string(),
            )
        } else {
            let args = vec!["offset"; intrinsic.arity].join(", ");
            (
                format!("Hlsl::{}({})", intrinsic.name, args),
                format!("{}({})", intrinsic.name, args),
            )
        };
        assert_eq!(lower(&host), hlsl, "{}", intrinsic.name);
    }
}

#[test]
fn test_intrinsic_arity_is_checked() {
    let err = decompile(
        KernelId::of::<Scratch>(),
        "|ids| { let v = Hlsl::dot(offset); }",
        fields(),
        Vec::new(),
    )
    .unwrap_err();
    assert!(err.to_string().contains("takes 2 arguments but 1"));
}
