//! Static source-category to native-node mapping table.

mod table;

pub use table::{
    BSDF_MIX, IMAGE, MappingEntry, SQRT, SWIZZLE_X, SWIZZLE_Y, entries, lookup, lookup_typed,
};
