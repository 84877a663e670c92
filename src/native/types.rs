//! Native renderer vocabulary: node types, input keys, arithmetic opcodes, and lookup values.
//!
//! Discriminants are the renderer's numeric identifiers so a binding layer can pass them
//! through unchanged.

/// Native material node type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
#[allow(missing_docs)]
pub enum NativeNodeType {
    Blend = 0xA,
    Arithmetic = 0xB,
    NormalMap = 0xD,
    ImageTexture = 0xE,
    ConstantTexture = 0x13,
    InputLookup = 0x14,
    BlendValue = 0x16,
    Passthrough = 0x17,

    MatxDiffuseBrdf = 0x1000,
    MatxDielectricBrdf = 0x1001,
    MatxGeneralizedSchlickBrdf = 0x1002,
    MatxNoise3d = 0x1003,
    MatxPosition = 0x1006,
    MatxRoughnessAnisotropy = 0x1007,
    MatxRotate3d = 0x1008,
    MatxNormalize = 0x1009,
    MatxIfGreater = 0x100A,
    MatxSheenBrdf = 0x100B,
    MatxDiffuseBtdf = 0x100C,
    MatxConvert = 0x100D,
    MatxSubsurfaceBrdf = 0x100E,
    MatxDielectricBtdf = 0x100F,
    MatxConductorBrdf = 0x1010,
    MatxFresnel = 0x1011,
    MatxLuminance = 0x1012,
}

/// Native material node input key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
#[allow(missing_docs)]
pub enum InputKey {
    Color = 0x0,
    Color0 = 0x1,
    Color1 = 0x2,
    Normal = 0x3,
    Uv = 0x4,
    Roughness = 0x6,
    Ior = 0x7,
    Weight = 0xB,
    Op = 0xC,
    Value = 0xF,
    Scale = 0x11,
    Color2 = 0x17,
    Color3 = 0x18,
    Anisotropic = 0x19,
    Radius = 0x22,
    Tangent = 0x2e,
    Distribution = 0x2f,
    Base = 0x30,
    Tint = 0x31,
    Exponent = 0x32,
    Amplitude = 0x33,
    Pivot = 0x34,
    Position = 0x35,
    Amount = 0x36,
    Axis = 0x37,
    LumaCoeff = 0x38,
    Reflectivity = 0x39,
    EdgeColor = 0x3a,
    ViewDirection = 0x3b,
    Interior = 0x3c,
    /// Generic first operand of the MaterialX utility nodes.
    Input0 = 0x1_0000,
    /// Generic second operand of the MaterialX utility nodes.
    Input1 = 0x1_0001,
}

/// Operation selected on a [`NativeNodeType::Arithmetic`] node through [`InputKey::Op`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
#[allow(missing_docs)]
pub enum ArithmeticOp {
    Add = 0x00,
    Sub = 0x01,
    Mul = 0x02,
    Div = 0x03,
    Sin = 0x04,
    Cos = 0x05,
    Tan = 0x06,
    SelectX = 0x07,
    SelectY = 0x08,
    Dot3 = 0x0B,
    Cross3 = 0x0C,
    Normalize3 = 0x0E,
    Pow = 0x0F,
    Acos = 0x10,
    Asin = 0x11,
    Min = 0x15,
    Max = 0x16,
    Floor = 0x17,
    Mod = 0x18,
    Abs = 0x19,
    Log = 0x20,
}

/// Intrinsic quantity exposed by a [`NativeNodeType::InputLookup`] node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
#[allow(missing_docs)]
pub enum LookupValue {
    Uv = 0x0,
    /// World-space shading normal.
    N = 0x1,
    /// World-space position.
    P = 0x2,
    Uv1 = 0x5,
    /// Object-space position.
    PLocal = 0x6,
}

impl NativeNodeType {
    /// Raw renderer identifier.
    pub fn id(self) -> u32 {
        self as u32
    }
}

impl InputKey {
    /// Raw renderer identifier.
    pub fn id(self) -> u32 {
        self as u32
    }
}

impl ArithmeticOp {
    /// Raw renderer identifier.
    pub fn id(self) -> u32 {
        self as u32
    }
}

impl LookupValue {
    /// Raw renderer identifier.
    pub fn id(self) -> u32 {
        self as u32
    }
}
