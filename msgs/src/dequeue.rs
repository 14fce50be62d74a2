use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

const LONG_MSG_LEN: usize = 1 << 20;

/// Returns the body range of the first complete frame in `input_buffer`.
pub fn dequeue_msg(input_buffer: &[u8]) -> Option<(usize, usize)> {
    if input_buffer.len() < 4 {
        return None
    }

    let mut rdr = Cursor::new(input_buffer);

    let msg_ln = rdr.read_u32::<LittleEndian>().ok()? as usize;

    if msg_ln > LONG_MSG_LEN {
        tracing::warn!(msg_ln, "long message");
    }

    let end = msg_ln + 4;

    if input_buffer.len() < end {
        return None
    }

    Some((4, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waits_for_complete_frame() {
        assert_eq!(dequeue_msg(&[3, 0]), None);
        assert_eq!(dequeue_msg(&[3, 0, 0, 0, 1, 2]), None);
        assert_eq!(dequeue_msg(&[3, 0, 0, 0, 1, 2, 3, 9]), Some((4, 7)));
    }
}
