//! Identifier de-collision against HLSL keywords and generated names.

use std::collections::HashSet;

use super::placeholder::INTRINSICS;

/// HLSL keywords and reserved words that cannot name a variable.
const RESERVED: &[&str] = &[
    "AppendStructuredBuffer", "BlendState", "Buffer", "ByteAddressBuffer", "CompileShader",
    "ComputeShader", "ConsumeStructuredBuffer", "DepthStencilState", "DomainShader",
    "GeometryShader", "Hullshader", "InputPatch", "LineStream", "OutputPatch", "PixelShader",
    "PointStream", "RWBuffer", "RWByteAddressBuffer", "RWStructuredBuffer", "RWTexture1D",
    "RWTexture2D", "RWTexture3D", "RasterizerState", "SamplerComparisonState", "SamplerState",
    "StructuredBuffer", "Texture1D", "Texture2D", "Texture3D", "TextureCube", "TriangleStream",
    "VertexShader", "asm", "break", "case", "cbuffer", "centroid", "class", "column_major",
    "compile", "const", "continue", "default", "discard", "do", "else", "export", "extern",
    "false", "for", "groupshared", "if", "in", "inline", "inout", "interface", "linear",
    "matrix", "namespace", "nointerpolation", "noperspective", "out", "packoffset", "pass",
    "precise", "register", "return", "row_major", "sample", "sampler", "shared", "snorm",
    "static", "string", "struct", "switch", "tbuffer", "technique", "texture", "true",
    "typedef", "uniform", "unorm", "unsigned", "vector", "void", "volatile", "while",
];

/// Scalar spellings that prefix HLSL vector and matrix type names.
const SCALAR_TYPES: &[&str] = &[
    "bool", "int", "uint", "dword", "half", "float", "double", "min16float", "min10float",
    "min16int", "min12int", "min16uint",
];

/// True when `name` is a built-in type name such as `float`, `int3` or
/// `double4x4`.
fn is_type_name(name: &str) -> bool {
    SCALAR_TYPES.iter().any(|scalar| {
        let Some(dims) = name.strip_prefix(scalar) else {
            return false;
        };
        match dims.as_bytes() {
            [] => true,
            [n] => (b'1'..=b'4').contains(n),
            [r, b'x', c] => (b'1'..=b'4').contains(r) && (b'1'..=b'4').contains(c),
            _ => false,
        }
    })
}

/// Whether a host identifier cannot be used verbatim in HLSL.
pub fn is_reserved(name: &str) -> bool {
    RESERVED.contains(&name)
        || is_type_name(name)
        || INTRINSICS.iter().any(|i| i.name == name)
}

/// Hands out unique HLSL identifiers.
///
/// A reserved name gets a leading underscore; a name already handed out
/// gets the first free numeric suffix (`x`, `x_1`, `x_2`, ...).
#[derive(Debug, Default)]
pub struct NameAllocator {
    taken: HashSet<String>,
}

impl NameAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allocate(&mut self, base: &str) -> String {
        let base = if is_reserved(base) {
            format!("_{}", base)
        } else {
            base.to_string()
        };
        let mut candidate = base.clone();
        let mut n = 1;
        while self.taken.contains(&candidate) {
            candidate = format!("{}_{}", base, n);
            n += 1;
        }
        self.taken.insert(candidate.clone());
        candidate
    }

    pub fn is_taken(&self, name: &str) -> bool {
        self.taken.contains(name)
    }
}

/// Shader identifiers for instance captures, in catalog order.
pub fn capture_names<'a>(fields: impl IntoIterator<Item = &'a str>) -> (NameAllocator, Vec<String>) {
    let mut names = NameAllocator::new();
    let allocated = fields.into_iter().map(|f| names.allocate(f)).collect();
    (names, allocated)
}
