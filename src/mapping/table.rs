use std::collections::BTreeMap;
use std::sync::LazyLock;

use crate::native::types::{ArithmeticOp, InputKey, NativeNodeType};

/// One row of the mapping table: the native node type a source category becomes, how its
/// inputs are keyed, and the arithmetic opcode for generic arithmetic nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MappingEntry {
    /// Native node type to create.
    pub ty: NativeNodeType,
    /// Source input name to native input key.
    pub inputs: &'static [(&'static str, InputKey)],
    /// Opcode bound through [`InputKey::Op`] when `ty` is [`NativeNodeType::Arithmetic`].
    pub op: Option<ArithmeticOp>,
}

impl MappingEntry {
    const fn new(ty: NativeNodeType, inputs: &'static [(&'static str, InputKey)]) -> Self {
        Self {
            ty,
            inputs,
            op: None,
        }
    }

    const fn arithmetic(op: ArithmeticOp, inputs: &'static [(&'static str, InputKey)]) -> Self {
        Self {
            ty: NativeNodeType::Arithmetic,
            inputs,
            op: Some(op),
        }
    }

    /// Native key for a source input name.
    pub fn input(&self, name: &str) -> Option<InputKey> {
        self.inputs
            .iter()
            .find_map(|&(n, key)| (n == name).then_some(key))
    }
}

use InputKey as K;

const UNARY: &[(&str, InputKey)] = &[("in", K::Color0)];
const BINARY: &[(&str, InputKey)] = &[("in1", K::Color0), ("in2", K::Color1)];

/// Two-BSDF `mix`, which maps to the closure blend node rather than the value blend.
pub static BSDF_MIX: MappingEntry = MappingEntry::new(
    NativeNodeType::Blend,
    &[("fg", K::Color1), ("bg", K::Color0), ("mix", K::Weight)],
);

/// `sqrt`, expressed as `pow(in, 0.5)`; the exponent is bound at creation.
pub static SQRT: MappingEntry = MappingEntry::arithmetic(ArithmeticOp::Pow, UNARY);

/// `swizzle` selecting the x channel.
pub static SWIZZLE_X: MappingEntry = MappingEntry::arithmetic(ArithmeticOp::SelectX, UNARY);

/// `swizzle` selecting the y channel.
pub static SWIZZLE_Y: MappingEntry = MappingEntry::arithmetic(ArithmeticOp::SelectY, UNARY);

/// `image`; every input other than `texcoord` is captured on the image descriptor.
pub static IMAGE: MappingEntry =
    MappingEntry::new(NativeNodeType::ImageTexture, &[("texcoord", K::Uv)]);

static TABLE: LazyLock<BTreeMap<&'static str, MappingEntry>> = LazyLock::new(build);

fn build() -> BTreeMap<&'static str, MappingEntry> {
    use NativeNodeType as T;

    let mut m = BTreeMap::new();
    let mut add = |name: &'static str, entry: MappingEntry| {
        m.insert(name, entry);
    };

    add(
        "diffuse_brdf",
        MappingEntry::new(
            T::MatxDiffuseBrdf,
            &[
                ("color", K::Color),
                ("weight", K::Weight),
                ("roughness", K::Roughness),
                ("normal", K::Normal),
            ],
        ),
    );
    add(
        "dielectric_brdf",
        MappingEntry::new(
            T::MatxDielectricBrdf,
            &[
                ("weight", K::Weight),
                ("tint", K::Tint),
                ("ior", K::Ior),
                ("roughness", K::Roughness),
                ("normal", K::Normal),
                ("tangent", K::Tangent),
                ("distribution", K::Distribution),
                ("base", K::Base),
            ],
        ),
    );
    add(
        "generalized_schlick_brdf",
        MappingEntry::new(
            T::MatxGeneralizedSchlickBrdf,
            &[
                ("color0", K::Color0),
                ("color90", K::Color1),
                ("exponent", K::Exponent),
                ("roughness", K::Roughness),
                ("weight", K::Weight),
                ("normal", K::Normal),
                ("tangent", K::Tangent),
                ("distribution", K::Distribution),
                ("base", K::Base),
            ],
        ),
    );
    add(
        "dielectric_btdf",
        MappingEntry::new(
            T::MatxDielectricBtdf,
            &[
                ("weight", K::Weight),
                ("tint", K::Color),
                ("ior", K::Ior),
                ("roughness", K::Roughness),
                ("normal", K::Normal),
                ("tangent", K::Tangent),
                ("distribution", K::Distribution),
                ("interior", K::Interior),
            ],
        ),
    );
    add(
        "sheen_brdf",
        MappingEntry::new(
            T::MatxSheenBrdf,
            &[
                ("weight", K::Weight),
                ("color", K::Color),
                ("roughness", K::Roughness),
                ("normal", K::Normal),
                ("base", K::Base),
            ],
        ),
    );
    add(
        "subsurface_brdf",
        MappingEntry::new(
            T::MatxSubsurfaceBrdf,
            &[
                ("weight", K::Weight),
                ("color", K::Color),
                ("radius", K::Radius),
                ("anisotropy", K::Anisotropic),
                ("normal", K::Normal),
            ],
        ),
    );
    add(
        "diffuse_btdf",
        MappingEntry::new(
            T::MatxDiffuseBtdf,
            &[
                ("weight", K::Weight),
                ("color", K::Color),
                ("normal", K::Normal),
            ],
        ),
    );
    add(
        "conductor_brdf",
        MappingEntry::new(
            T::MatxConductorBrdf,
            &[
                ("weight", K::Weight),
                ("reflectivity", K::Reflectivity),
                ("edge_color", K::EdgeColor),
                ("roughness", K::Roughness),
                ("normal", K::Normal),
                ("tangent", K::Tangent),
                ("distribution", K::Distribution),
            ],
        ),
    );
    add(
        "fresnel",
        MappingEntry::new(
            T::MatxFresnel,
            &[
                ("ior", K::Ior),
                ("normal", K::Normal),
                ("viewdirection", K::ViewDirection),
            ],
        ),
    );
    add(
        "constant",
        MappingEntry::new(T::ConstantTexture, &[("value", K::Value)]),
    );
    add(
        "mix",
        MappingEntry::new(
            T::BlendValue,
            &[("fg", K::Color1), ("bg", K::Color0), ("mix", K::Weight)],
        ),
    );
    add(
        "ifgreater",
        MappingEntry::new(
            T::MatxIfGreater,
            &[
                ("value1", K::Input0),
                ("value2", K::Input1),
                ("in1", K::Color0),
                ("in2", K::Color1),
            ],
        ),
    );
    add(
        "luminance",
        MappingEntry::new(
            T::MatxLuminance,
            &[("in", K::Input0), ("lumacoeffs", K::LumaCoeff)],
        ),
    );
    add("convert", MappingEntry::new(T::MatxConvert, &[("in", K::Input0)]));
    add(
        "rotate3d",
        MappingEntry::new(
            T::MatxRotate3d,
            &[("in", K::Input0), ("amount", K::Amount), ("axis", K::Axis)],
        ),
    );
    add(
        "roughness_anisotropy",
        MappingEntry::new(
            T::MatxRoughnessAnisotropy,
            &[("roughness", K::Roughness), ("anisotropy", K::Anisotropic)],
        ),
    );
    add(
        "noise3d",
        MappingEntry::new(
            T::MatxNoise3d,
            &[
                ("amplitude", K::Amplitude),
                ("pivot", K::Pivot),
                ("position", K::Position),
            ],
        ),
    );
    add(
        "normalmap",
        MappingEntry::new(T::NormalMap, &[("in", K::Color), ("scale", K::Scale)]),
    );
    add("position", MappingEntry::new(T::MatxPosition, &[]));

    use ArithmeticOp as Op;
    for (name, op) in [
        ("sin", Op::Sin),
        ("cos", Op::Cos),
        ("tan", Op::Tan),
        ("asin", Op::Asin),
        ("acos", Op::Acos),
        ("absval", Op::Abs),
        ("floor", Op::Floor),
        ("ln", Op::Log),
        ("normalize", Op::Normalize3),
    ] {
        add(name, MappingEntry::arithmetic(op, UNARY));
    }
    for (name, op) in [
        ("add", Op::Add),
        ("subtract", Op::Sub),
        ("multiply", Op::Mul),
        ("divide", Op::Div),
        ("power", Op::Pow),
        ("min", Op::Min),
        ("max", Op::Max),
        ("dotproduct", Op::Dot3),
        ("crossproduct", Op::Cross3),
        ("modulo", Op::Mod),
    ] {
        add(name, MappingEntry::arithmetic(op, BINARY));
    }
    add(
        "invert",
        MappingEntry::arithmetic(Op::Sub, &[("amount", K::Color0), ("in", K::Color1)]),
    );
    // Approximates clamp by its lower bound only.
    add(
        "clamp",
        MappingEntry::arithmetic(Op::Max, &[("in", K::Color0), ("low", K::Color1)]),
    );

    m
}

/// Look up the direct native equivalent of a source node category.
pub fn lookup(category: &str) -> Option<&'static MappingEntry> {
    TABLE.get(category)
}

/// Entry for a node of `category` producing `output_type`, covering the type-dependent
/// `mix` dispatch.
pub fn lookup_typed(category: &str, output_type: &str) -> Option<&'static MappingEntry> {
    if category == "mix" && output_type == "BSDF" {
        return Some(&BSDF_MIX);
    }
    lookup(category)
}

/// Every table-mapped category with its entry, in name order.
pub fn entries() -> impl Iterator<Item = (&'static str, &'static MappingEntry)> {
    TABLE.iter().map(|(&name, entry)| (name, entry))
}

#[cfg(test)]
#[path = "../../tests/unit/mapping/table.rs"]
mod tests;
