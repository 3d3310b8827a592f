//! `Range` value runtime, grounded on `runtime/range.h`/`range.cpp`.

#[repr(C)]
pub struct XRange {
    pub start: i64,
    pub stop: i64,
    pub step: i64,
}

/// # Safety
/// None — pure value function, no pointers dereferenced.
pub unsafe extern "C" fn x_range_create(start: i64, stop: i64, step: i64) -> *mut XRange {
    if step == 0 {
        crate::print_rt::die_with_message("zero range step");
    }
    Box::into_raw(Box::new(XRange { start, stop, step }))
}

/// # Safety
/// `that` must be a valid, readable `*const XRange`.
pub unsafe extern "C" fn x_range_length(that: *const XRange) -> i64 {
    let r = &*that;
    let dist = r.stop - r.start;
    if (dist > 0 && r.step < 0) || (dist < 0 && r.step > 0) {
        return 0;
    }
    (dist as f64 / r.step as f64).ceil() as i64
}

/// # Safety
/// `that` must be a valid, readable `*const XRange`.
pub unsafe extern "C" fn x_range_get(that: *const XRange, idx: i64) -> i64 {
    let r = &*that;
    r.start + r.step * idx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_of_ascending_range() {
        let r = XRange { start: 1, stop: 5, step: 1 };
        assert_eq!(unsafe { x_range_length(&r) }, 4);
    }

    #[test]
    fn length_of_mismatched_direction_is_zero() {
        let r = XRange { start: 1, stop: 5, step: -1 };
        assert_eq!(unsafe { x_range_length(&r) }, 0);
    }

    #[test]
    fn get_walks_by_step() {
        let r = XRange { start: 10, stop: 0, step: -2 };
        assert_eq!(unsafe { x_range_get(&r, 0) }, 10);
        assert_eq!(unsafe { x_range_get(&r, 3) }, 4);
    }
}
