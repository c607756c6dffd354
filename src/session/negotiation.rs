use crate::camera::Resolution;

/// Pick the preview resolution for a freshly opened device.
///
/// An empty list means the device could not report its sizes; the desired resolution is
/// passed through and the device gets to accept or reject it at configure time. When the
/// desired size is not advertised, the entry in the middle of the list is used.
pub fn negotiate_resolution(supported: &[Resolution], desired: Resolution) -> Resolution {
    if supported.is_empty() || supported.contains(&desired) {
        return desired;
    }
    supported[supported.len() / 2]
}
