use crate::foundation::error::{LoaderError, LoaderResult};

/// A parsed literal value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// `float`.
    Float(f32),
    /// `integer`.
    Integer(i32),
    /// `boolean`.
    Boolean(bool),
    /// `vector2` or `color2`.
    Vec2([f32; 2]),
    /// `vector3` or `color3`.
    Vec3([f32; 3]),
    /// `vector4` or `color4`.
    Vec4([f32; 4]),
    /// `string`.
    String(String),
    /// `filename`.
    Filename(String),
}

impl Value {
    /// Parse `text` as a literal of the named value type.
    ///
    /// Vector components are comma separated; surrounding whitespace is ignored.
    pub fn parse(text: &str, ty: &str) -> LoaderResult<Self> {
        let text = text.trim();
        Ok(match ty {
            "float" => Self::Float(parse_float(text)?),
            "integer" => Self::Integer(
                text.parse()
                    .map_err(|_| LoaderError::unsupported(format!("invalid integer: {text}")))?,
            ),
            "boolean" => Self::Boolean(match text {
                "true" => true,
                "false" => false,
                _ => return Err(LoaderError::unsupported(format!("invalid boolean: {text}"))),
            }),
            "vector2" | "color2" => Self::Vec2(parse_floats(text)?),
            "vector3" | "color3" => Self::Vec3(parse_floats(text)?),
            "vector4" | "color4" => Self::Vec4(parse_floats(text)?),
            "string" => Self::String(text.to_owned()),
            "filename" => Self::Filename(text.to_owned()),
            other => {
                return Err(LoaderError::unsupported(format!(
                    "failed to parse {text} value: unsupported type - {other}"
                )));
            }
        })
    }

    /// Promote to the four-component form used by native float inputs.
    ///
    /// Scalars broadcast into the first three components; missing components are zero. Strings
    /// and filenames have no numeric form.
    pub fn to_float4(&self) -> Option<[f32; 4]> {
        let broadcast = |v: f32| [v, v, v, 0.0];
        match self {
            Self::Float(v) => Some(broadcast(*v)),
            Self::Integer(v) => Some(broadcast(*v as f32)),
            Self::Boolean(v) => Some(broadcast(if *v { 1.0 } else { 0.0 })),
            Self::Vec2([x, y]) => Some([*x, *y, 0.0, 0.0]),
            Self::Vec3([x, y, z]) => Some([*x, *y, *z, 0.0]),
            Self::Vec4(v) => Some(*v),
            Self::String(_) | Self::Filename(_) => None,
        }
    }
}

fn parse_float(text: &str) -> LoaderResult<f32> {
    text.trim()
        .parse()
        .map_err(|_| LoaderError::unsupported(format!("invalid float: {text}")))
}

fn parse_floats<const N: usize>(text: &str) -> LoaderResult<[f32; N]> {
    let mut out = [0.0; N];
    let mut parts = text.split(',');
    for slot in &mut out {
        let part = parts
            .next()
            .ok_or_else(|| LoaderError::unsupported(format!("expected {N} components: {text}")))?;
        *slot = parse_float(part)?;
    }
    if parts.next().is_some() {
        return Err(LoaderError::unsupported(format!(
            "expected {N} components: {text}"
        )));
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/document/value.rs"]
mod tests;
