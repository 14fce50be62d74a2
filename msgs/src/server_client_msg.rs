use std::io::{Cursor, Write};

use anyhow::{bail, Context};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::{codec::{read_bool, read_bytes, read_str, write_bool, write_bytes, write_frame, write_str}, dequeue::dequeue_msg, error_code::ServiceError, watch::{WatchKind, WatchedEvent}};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Exists (bool),
    Data (Vec<u8>),
    Children (Vec<String>),
    Created (String),
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerClientMsg {
    Hello { session_id: u32 },
    Reply { request_id: u32, result: Result<Reply, ServiceError> },
    Watch (WatchedEvent),
}

impl ServerClientMsg {
    pub fn dequeue_and_decode(input_buffer: &[u8]) -> Option<(usize, anyhow::Result<ServerClientMsg>)> {
        let (begin, end) = dequeue_msg(input_buffer)?;
        let msg = Self::decode(&input_buffer[begin..end]);
        Some((end, msg))
    }

    pub fn decode(input_buffer: &[u8]) -> anyhow::Result<ServerClientMsg> {
        let mut rdr = Cursor::new(input_buffer);
        let msg_type_index = rdr.read_u32::<LittleEndian>().context("missing msg type")?;

        let msg = match msg_type_index {
            0 => {
                let session_id = rdr.read_u32::<LittleEndian>().context("missing session id")?;
                ServerClientMsg::Hello { session_id }
            }
            1 => {
                let request_id = rdr.read_u32::<LittleEndian>().context("missing request id")?;
                let status = rdr.read_u32::<LittleEndian>().context("missing status")?;
                let result = if status == 0 {
                    Ok(decode_reply(&mut rdr)?)
                } else {
                    Err(ServiceError::from_u32(status).context("unsupported status code")?)
                };
                ServerClientMsg::Reply { request_id, result }
            }
            2 => {
                let kind_index = rdr.read_u32::<LittleEndian>().context("missing watch kind")?;
                let kind = WatchKind::from_u32(kind_index).context("unsupported watch kind")?;
                let path = read_str(&mut rdr)?;
                ServerClientMsg::Watch (WatchedEvent { kind, path })
            }
            type_index => {
                bail!("unsupported msg type: {type_index}");
            }
        };

        Ok(msg)
    }

    pub fn pack(&self, wtr: &mut impl Write) -> std::io::Result<()> {
        let mut body = Vec::new();
        match self {
            ServerClientMsg::Hello { session_id } => {
                body.write_u32::<LittleEndian>(0)?;
                body.write_u32::<LittleEndian>(*session_id)?;
            }
            ServerClientMsg::Reply { request_id, result } => {
                body.write_u32::<LittleEndian>(1)?;
                body.write_u32::<LittleEndian>(*request_id)?;
                match result {
                    Ok(reply) => {
                        body.write_u32::<LittleEndian>(0)?;
                        pack_reply(reply, &mut body)?;
                    }
                    Err(error) => body.write_u32::<LittleEndian>(error.as_u32())?,
                }
            }
            ServerClientMsg::Watch (event) => {
                body.write_u32::<LittleEndian>(2)?;
                body.write_u32::<LittleEndian>(event.kind.as_u32())?;
                write_str(&mut body, &event.path)?;
            }
        }
        write_frame(wtr, &body)
    }
}

fn decode_reply(rdr: &mut Cursor<&[u8]>) -> anyhow::Result<Reply> {
    let reply_type_index = rdr.read_u32::<LittleEndian>().context("missing reply type")?;
    let reply = match reply_type_index {
        0 => Reply::Exists (read_bool(rdr)?),
        1 => Reply::Data (read_bytes(rdr)?),
        2 => {
            let count = rdr.read_u32::<LittleEndian>().context("missing child count")?;
            let mut children = Vec::with_capacity(count.min(4096) as usize);
            for _ in 0..count {
                children.push(read_str(rdr)?);
            }
            Reply::Children (children)
        }
        3 => Reply::Created (read_str(rdr)?),
        4 => Reply::Done,
        type_index => bail!("unsupported reply type: {type_index}"),
    };
    Ok(reply)
}

fn pack_reply(reply: &Reply, wtr: &mut impl Write) -> std::io::Result<()> {
    match reply {
        Reply::Exists (exists) => {
            wtr.write_u32::<LittleEndian>(0)?;
            write_bool(wtr, *exists)
        }
        Reply::Data (data) => {
            wtr.write_u32::<LittleEndian>(1)?;
            write_bytes(wtr, data)
        }
        Reply::Children (children) => {
            wtr.write_u32::<LittleEndian>(2)?;
            wtr.write_u32::<LittleEndian>(children.len() as u32)?;
            for child in children {
                write_str(wtr, child)?;
            }
            Ok(())
        }
        Reply::Created (path) => {
            wtr.write_u32::<LittleEndian>(3)?;
            write_str(wtr, path)
        }
        Reply::Done => wtr.write_u32::<LittleEndian>(4),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn through_wire(msg: &ServerClientMsg) -> ServerClientMsg {
        let mut bytes = Vec::new();
        msg.pack(&mut bytes).unwrap();
        let (cursor, decoded) = ServerClientMsg::dequeue_and_decode(&bytes).unwrap();
        assert_eq!(cursor, bytes.len());
        decoded.unwrap()
    }

    #[test]
    fn error_status_carries_no_payload() {
        let msg = ServerClientMsg::Reply { request_id: 3, result: Err(ServiceError::NodeExists) };
        assert_eq!(through_wire(&msg), msg);
    }

    #[test]
    fn children_listing() {
        let msg = ServerClientMsg::Reply {
            request_id: 9,
            result: Ok(Reply::Children(vec!["cell_1,2".into(), "cell_0,0".into()])),
        };
        assert_eq!(through_wire(&msg), msg);
    }

    #[test]
    fn watch_notification() {
        let msg = ServerClientMsg::Watch(WatchedEvent { kind: WatchKind::Children, path: "/canvas/region_0,0/cells".into() });
        assert_eq!(through_wire(&msg), msg);
    }

    #[test]
    fn unknown_status_code_is_rejected() {
        let bytes = [1, 0, 0, 0, 5, 0, 0, 0, 77, 0, 0, 0];
        assert!(ServerClientMsg::decode(&bytes).is_err());
    }
}
