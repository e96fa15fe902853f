#![allow(dead_code)]

use std::collections::BTreeMap;

use tensordag::tensor::TensorHandle;
use tensordag::world::World;

/// Build named tensors on `world` from `(name, elems, fill)` specs, in spec
/// order so tensor ids are deterministic.
pub fn make_tensors(world: &World, specs: &[(&str, usize, f64)]) -> BTreeMap<String, TensorHandle> {
    specs
        .iter()
        .map(|&(name, elems, fill)| (name.to_string(), TensorHandle::new(name, elems, fill, world)))
        .collect()
}
