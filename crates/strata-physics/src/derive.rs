//! Derived quantities computed from `State`.

use strata_core::{DeriveList, DeriveRec, IndexBox};
use strata_grid::Fab;

pub(crate) const DENSITY: usize = 0;
pub(crate) const XMOM: usize = 1;
pub(crate) const TEMP: usize = 4;

/// Every derived quantity the relaxation model offers.
pub fn derive_list() -> DeriveList {
    let mut list = DeriveList::new();
    list.add(DeriveRec::scalar("x_velocity"));
    list.add(DeriveRec::scalar("y_velocity"));
    list.add(DeriveRec::scalar("z_velocity"));
    list.add(DeriveRec::scalar("magvel"));
    list.add(DeriveRec::scalar("kineng"));
    list.add(DeriveRec::new("velocity", ["u", "v", "w"]));
    list
}

fn velocity(state: &Fab, iv: &strata_core::IntVect) -> [f64; 3] {
    let rho = state.get(iv, DENSITY);
    std::array::from_fn(|d| state.get(iv, XMOM + d) / rho)
}

/// Fill `out` over `region` with derived quantity `name`. Returns `false`
/// for an unknown name.
pub(crate) fn fill(name: &str, state: &Fab, region: &IndexBox, out: &mut Fab) -> bool {
    let scalar: fn(&Fab, &strata_core::IntVect) -> f64 = match name {
        "x_velocity" => |s, iv| velocity(s, iv)[0],
        "y_velocity" => |s, iv| velocity(s, iv)[1],
        "z_velocity" => |s, iv| velocity(s, iv)[2],
        "magvel" => |s, iv| velocity(s, iv).iter().map(|u| u * u).sum::<f64>().sqrt(),
        "kineng" => |s, iv| {
            0.5 * s.get(iv, DENSITY) * velocity(s, iv).iter().map(|u| u * u).sum::<f64>()
        },
        "velocity" => {
            for iv in region.cells() {
                let u = velocity(state, &iv);
                for (d, v) in u.into_iter().enumerate() {
                    out.set(&iv, d, v);
                }
            }
            return true;
        }
        _ => return false,
    };
    for iv in region.cells() {
        out.set(&iv, 0, scalar(state, &iv));
    }
    true
}
