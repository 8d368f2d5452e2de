use super::*;
use crate::kernel::Capture;
use crate::syntax::parse_closure;

static LIMIT: f32 = 0.5;
static SCALE: f32 = 2.0;

fn statics() -> Vec<StaticField> {
    vec![
        StaticField::new("params::LIMIT", "f32", || Capture::pod(&LIMIT)),
        StaticField::new("a::Tuning::SCALE", "f32", || Capture::pod(&SCALE)),
        StaticField::new("b::Tuning::SCALE", "f32", || Capture::pod(&SCALE)),
    ]
}

fn fields() -> Vec<FieldDecl> {
    vec![
        FieldDecl::instance("input", "ReadOnlyBuffer<f32>"),
        FieldDecl::instance("output", "ReadWriteBuffer<f32>"),
        FieldDecl::instance("factor", "f32"),
        FieldDecl::instance("count", "u32"),
        FieldDecl::instance("offset", "Float4"),
        FieldDecl::instance("transform", "Float4x4"),
        FieldDecl::instance("weights", "ConstantBuffer<Float2>"),
    ]
}

fn bind_source(source: &str) -> Result<(Closure, SymbolModel), Vec<Diagnostic>> {
    let closure = parse_closure(source)?;
    let model = bind(&closure, &fields(), &statics())?;
    Ok((closure, model))
}

fn check(source: &str) -> SymbolModel {
    match bind_source(source) {
        Ok((_, model)) => model,
        Err(diags) => panic!("binding failed: {:?}", diags),
    }
}

fn errors(source: &str) -> Vec<String> {
    match bind_source(source) {
        Ok(_) => panic!("expected binding to fail: {}", source),
        Err(diags) => diags.into_iter().map(|d| d.message).collect(),
    }
}

fn has_error(source: &str, needle: &str) {
    let errs = errors(source);
    assert!(
        errs.iter().any(|e| e.contains(needle)),
        "expected `{}` in {:?}",
        needle,
        errs
    );
}

/// Type of the initializer of the `n`-th statement (a `let`).
fn let_type(source: &str, n: usize) -> Ty {
    let (closure, model) = match bind_source(source) {
        Ok(pair) => pair,
        Err(diags) => panic!("binding failed: {:?}", diags),
    };
    match &closure.body.node.stmts[n].node {
        Stmt::Let { init: Some(init), .. } => model.ty(init.span).cloned().unwrap(),
        other => panic!("expected let, got {:?}", other),
    }
}

#[test]
fn test_param_is_first_local() {
    let model = check("|ids: ThreadIds| { output[ids.x] = input[ids.x]; }");
    assert_eq!(model.local(LocalId::PARAM).name, "ids");
    assert_eq!(model.local(LocalId::PARAM).ty, Ty::ThreadIds);
}

#[test]
fn test_captures_and_locals_resolve() {
    let source = "|ids| { let v = input[ids.x] * factor; output[ids.x] = v; }";
    let (closure, model) = bind_source(source).unwrap();
    let Stmt::Let { name, .. } = &closure.body.node.stmts[0].node else {
        panic!("expected let");
    };
    assert_eq!(model.symbol(name.span), Some(Symbol::Local(LocalId(1))));
    let factor_at = source.find("factor").unwrap() as u32;
    let span = Span::new(factor_at, factor_at + "factor".len() as u32);
    assert_eq!(model.symbol(span), Some(Symbol::Capture(2)));
}

#[test]
fn test_unsuffixed_literal_takes_context_type() {
    assert_eq!(
        let_type("|ids| { let a = count + 1; }", 0),
        Ty::Scalar(ScalarKind::UInt)
    );
    assert_eq!(
        let_type("|ids| { let a = factor * 2.0; }", 0),
        Ty::Scalar(ScalarKind::Float)
    );
    assert_eq!(let_type("|ids| { let a = 3; }", 0), Ty::Scalar(ScalarKind::Int));
}

#[test]
fn test_integer_literals_never_become_floats() {
    has_error("|ids| { let a: f32 = 1; }", "expected `f32`, found `i32`");
    has_error("|ids| { let a = factor * 2; }", "cannot apply `*`");
    has_error("|ids| { let a = 1 + 2.5; }", "cannot apply `+`");
    has_error("|ids| { output[ids.x] = 0; }", "cannot assign `i32` to `f32`");
    check("|ids| { let a: f32 = 1.0; let b: u32 = 1; }");
}

#[test]
fn test_literal_suffixes() {
    assert_eq!(let_type("|ids| { let a = 3u; }", 0), Ty::Scalar(ScalarKind::UInt));
    assert_eq!(let_type("|ids| { let a = 3usize; }", 0), Ty::Scalar(ScalarKind::UInt));
    assert_eq!(let_type("|ids| { let a = 1.5d; }", 0), Ty::Scalar(ScalarKind::Double));
    assert_eq!(let_type("|ids| { let a = 1f32; }", 0), Ty::Scalar(ScalarKind::Float));
}

#[test]
fn test_flexible_local_is_refined_by_first_use() {
    let model = check("|ids| { let mut i = 0; i = ids.x; }");
    assert_eq!(model.local(LocalId(1)).ty, Ty::Scalar(ScalarKind::UInt));
}

#[test]
fn test_suffixed_literal_does_not_coerce() {
    has_error("|ids| { let a = count + 1i32; }", "cannot apply `+`");
}

#[test]
fn test_vector_scalar_mix_and_compare() {
    assert_eq!(
        let_type("|ids| { let a = offset * factor; }", 0),
        Ty::Vector(ScalarKind::Float, 4)
    );
    assert_eq!(
        let_type("|ids| { let a = offset * 2.0; }", 0),
        Ty::Vector(ScalarKind::Float, 4)
    );
    assert_eq!(
        let_type("|ids| { let a = offset < offset; }", 0),
        Ty::Vector(ScalarKind::Bool, 4)
    );
}

#[test]
fn test_matrix_vector_product_needs_mul() {
    has_error("|ids| { let a = transform * offset; }", "cannot apply `*`");
    assert_eq!(
        let_type("|ids| { let a = Hlsl::mul(transform, offset); }", 0),
        Ty::Vector(ScalarKind::Float, 4)
    );
}

#[test]
fn test_matrix_negation_and_elements() {
    assert_eq!(
        let_type("|ids| { let a = -transform; }", 0),
        Ty::Matrix(ScalarKind::Float, 4, 4)
    );
    assert_eq!(
        let_type("|ids| { let a = transform.m23(); }", 0),
        Ty::Scalar(ScalarKind::Float)
    );
    assert_eq!(
        let_type("|ids| { let a = transform[1]; }", 0),
        Ty::Vector(ScalarKind::Float, 4)
    );
}

#[test]
fn test_matrix_swizzle_index() {
    assert_eq!(
        let_type(
            "|ids| { let a = transform[(MatrixIndex::M11, MatrixIndex::M22, MatrixIndex::M33)]; }",
            0
        ),
        Ty::Vector(ScalarKind::Float, 3)
    );
    has_error(
        "|ids| { let a = transform[(MatrixIndex::M11, MatrixIndex::M55)]; }",
        "expected a `MatrixIndex` selector",
    );
    has_error("|ids| { let a = MatrixIndex::M11; }", "inside a matrix indexer");
}

#[test]
fn test_swizzles_and_components() {
    assert_eq!(
        let_type("|ids| { let a = offset.zyx(); }", 0),
        Ty::Vector(ScalarKind::Float, 3)
    );
    assert_eq!(let_type("|ids| { let a = offset.w; }", 0), Ty::Scalar(ScalarKind::Float));
    has_error("|ids| { let a = ids.w; }", "no field `w`");
    has_error("|ids| { let a = weights[0].xyz(); }", "no method named `xyz`");
}

#[test]
fn test_constructors() {
    assert_eq!(
        let_type("|ids| { let a = Float4::new(offset.xy(), 1.0, factor); }", 0),
        Ty::Vector(ScalarKind::Float, 4)
    );
    assert_eq!(
        let_type("|ids| { let a = Float3::splat(0.0); }", 0),
        Ty::Vector(ScalarKind::Float, 3)
    );
    has_error("|ids| { let a = Float4::new(1.0, 2.0); }", "expects 4 components, found 2");
    has_error("|ids| { let a = Widget::new(1.0); }", "not a vector or matrix constructor");
}

#[test]
fn test_intrinsics_and_scalar_methods() {
    assert_eq!(
        let_type("|ids| { let a = Hlsl::dot(offset, offset); }", 0),
        Ty::Scalar(ScalarKind::Float)
    );
    assert_eq!(
        let_type("|ids| { let a = factor.sqrt().max(1.0); }", 0),
        Ty::Scalar(ScalarKind::Float)
    );
    has_error("|ids| { let a = Hlsl::frobnicate(factor); }", "cannot find function");
    has_error("|ids| { let a = Hlsl::lerp(factor, factor); }", "takes 3 arguments but 2 were supplied");
    has_error("|ids| { let a = count.sqrt(); }", "no method named `sqrt`");
}

#[test]
fn test_intrinsic_literal_in_first_position_takes_other_operand_type() {
    assert_eq!(
        let_type("|ids| { let y = Hlsl::max(0.0, factor); }", 0),
        Ty::Scalar(ScalarKind::Float)
    );
    assert_eq!(
        let_type("|ids| { let y = Hlsl::max(0, count); }", 0),
        Ty::Scalar(ScalarKind::UInt)
    );
    assert_eq!(
        let_type("|ids| { let w = Hlsl::max(0.0, offset); }", 0),
        Ty::Vector(ScalarKind::Float, 4)
    );
    assert_eq!(
        let_type("|ids| { let w = Hlsl::clamp(offset, 0.0, 1.0); }", 0),
        Ty::Vector(ScalarKind::Float, 4)
    );
    assert_eq!(
        let_type("|ids| { let d = Hlsl::dot(offset, offset); let s = Hlsl::step(0.5, offset); }", 1),
        Ty::Vector(ScalarKind::Float, 4)
    );
    check("|ids| { let w = Hlsl::max(0.0, offset); output[ids.x] = w.x; }");
    check("|ids| { let y = Hlsl::max(0.0, factor); output[ids.x] = y; }");
}

#[test]
fn test_intrinsic_settles_flexible_locals() {
    let model = check("|ids| { let a = 0; let b = Hlsl::min(a, count); }");
    assert_eq!(model.local(LocalId(1)).ty, Ty::Scalar(ScalarKind::UInt));
}

#[test]
fn test_intrinsic_operand_mismatch() {
    has_error("|ids| { let y = Hlsl::max(0, factor); }", "`max` expects `f32`, found `i32`");
    has_error("|ids| { let y = Hlsl::min(count, factor); }", "`min` expects `u32`, found `f32`");
    has_error(
        "|ids| { let y = Hlsl::dot(offset, offset.xyz()); }",
        "`dot` expects `Float4`, found `Float3`",
    );
}

#[test]
fn test_statics_resolve_by_unique_suffix() {
    let source = "|ids| { output[ids.x] = LIMIT + params::LIMIT; }";
    let (_, model) = bind_source(source).unwrap();
    let at = source.find("LIMIT").unwrap() as u32;
    assert_eq!(model.symbol(Span::new(at, at + 5)), Some(Symbol::Static(0)));
    has_error("|ids| { let a = Tuning::SCALE; }", "is ambiguous");
    assert_eq!(
        let_type("|ids| { let a = a::Tuning::SCALE; }", 0),
        Ty::Scalar(ScalarKind::Float)
    );
}

#[test]
fn test_unknown_names() {
    has_error("|ids| { let a = missing; }", "cannot find value `missing`");
    has_error("|ids| { helper(1); }", "cannot find function `helper`");
}

#[test]
fn test_assignment_rules() {
    has_error("|ids| { input[ids.x] = 1.0; }", "cannot assign through a `ReadOnlyBuffer`");
    has_error("|ids| { factor = 1.0; }", "cannot assign to captured value `factor`");
    has_error("|ids| { LIMIT = 1.0; }", "cannot assign to static `LIMIT`");
    has_error("|ids| { let a = 1.0; a = 2.0; }", "cannot assign twice to immutable variable");
    has_error("|ids| { offset.xy() = 1.0; }", "invalid left-hand side");
    check("|ids| { let mut v = offset; v.x = 1.0; v[2] += factor; }");
}

#[test]
fn test_assignment_type_mismatch() {
    has_error("|ids| { output[ids.x] = offset; }", "cannot assign `Float4` to `f32`");
}

#[test]
fn test_control_flow_rules() {
    has_error("|ids| { if factor { } }", "expected `bool`, found `f32`");
    has_error("|ids| { break; }", "`break` outside of a loop");
    has_error("|ids| { for i in 0.0..4.0 { } }", "`for` ranges must be integers");
    check("|ids| { for i in 0..count { if i == 3 { continue; } output[i] = 0.0; } }");
    check("|ids| { let mut n = 0; loop { n += 1; if n > 4 { break; } } }");
}

#[test]
fn test_let_rules() {
    has_error("|ids| { let a; }", "type annotations needed for `a`");
    has_error("|ids| { let b = input; }", "cannot bind a value of type");
    has_error("|ids| { let a: f32 = true; }", "expected `f32`, found `bool`");
    check("|ids| { let mut a: f32; a = 1.0; }");
}

#[test]
fn test_param_annotation_must_be_thread_ids() {
    has_error("|ids: u32| { }", "must have type `ThreadIds`");
}

#[test]
fn test_logical_and_not() {
    assert_eq!(
        let_type("|ids| { let a = !(factor > 1.0) && true; }", 0),
        Ty::Scalar(ScalarKind::Bool)
    );
    assert_eq!(let_type("|ids| { let a = !count; }", 0), Ty::Scalar(ScalarKind::UInt));
    has_error("|ids| { let a = !factor; }", "cannot apply unary operator `!`");
    has_error("|ids| { let a = -count; }", "cannot apply unary operator `-`");
}

#[test]
fn test_casts() {
    assert_eq!(
        let_type("|ids| { let a = ids.x as f32; }", 0),
        Ty::Scalar(ScalarKind::Float)
    );
    has_error("|ids| { let a = offset as f32; }", "non-primitive cast");
    has_error("|ids| { let a = count as bool; }", "cannot cast `u32` as `bool`");
}

#[test]
fn test_unsupported_capture_type_in_body() {
    let closure = parse_closure("|ids| { let a = table; }").unwrap();
    let fields = vec![FieldDecl::instance("table", "Vec<f32>")];
    let errs = bind(&closure, &fields, &[]).unwrap_err();
    assert!(errs[0].message.contains("which kernels cannot use"));
}
