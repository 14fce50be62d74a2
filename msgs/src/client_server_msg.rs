use std::io::{Cursor, Write};

use anyhow::{bail, Context};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::{codec::{read_bool, read_bytes, read_str, write_bool, write_bytes, write_frame, write_str}, create_mode::CreateMode, dequeue::dequeue_msg};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientServerMsg {
    Disconnect,
    Exists { request_id: u32, path: String, watch: bool },
    GetData { request_id: u32, path: String, watch: bool },
    GetChildren { request_id: u32, path: String, watch: bool },
    Create { request_id: u32, path: String, mode: CreateMode, data: Option<Vec<u8>> },
    SetData { request_id: u32, path: String, data: Vec<u8> },
}

impl ClientServerMsg {
    pub fn dequeue_and_decode(input_buffer: &[u8]) -> Option<(usize, anyhow::Result<ClientServerMsg>)> {
        let (begin, end) = dequeue_msg(input_buffer)?;
        let msg = Self::decode(&input_buffer[begin..end]);
        Some((end, msg))
    }

    pub fn request_id(&self) -> Option<u32> {
        match self {
            ClientServerMsg::Disconnect => None,
            ClientServerMsg::Exists { request_id, .. }
            | ClientServerMsg::GetData { request_id, .. }
            | ClientServerMsg::GetChildren { request_id, .. }
            | ClientServerMsg::Create { request_id, .. }
            | ClientServerMsg::SetData { request_id, .. } => Some(*request_id),
        }
    }

    pub fn decode(input_buffer: &[u8]) -> anyhow::Result<ClientServerMsg> {
        let mut rdr = Cursor::new(input_buffer);
        let msg_type_index = rdr.read_u32::<LittleEndian>().context("missing msg type")?;

        if msg_type_index == 0 {
            return Ok(ClientServerMsg::Disconnect);
        }

        let request_id = rdr.read_u32::<LittleEndian>().context("missing request id")?;

        let msg = match msg_type_index {
            1 => {
                let path = read_str(&mut rdr)?;
                let watch = read_bool(&mut rdr)?;
                ClientServerMsg::Exists { request_id, path, watch }
            }
            2 => {
                let path = read_str(&mut rdr)?;
                let watch = read_bool(&mut rdr)?;
                ClientServerMsg::GetData { request_id, path, watch }
            }
            3 => {
                let path = read_str(&mut rdr)?;
                let watch = read_bool(&mut rdr)?;
                ClientServerMsg::GetChildren { request_id, path, watch }
            }
            4 => {
                let path = read_str(&mut rdr)?;
                let mode_index = rdr.read_u32::<LittleEndian>().context("missing create mode")?;
                let mode = CreateMode::from_u32(mode_index).context("unsupported create mode")?;
                let data = if read_bool(&mut rdr)? { Some(read_bytes(&mut rdr)?) } else { None };
                ClientServerMsg::Create { request_id, path, mode, data }
            }
            5 => {
                let path = read_str(&mut rdr)?;
                let data = read_bytes(&mut rdr)?;
                ClientServerMsg::SetData { request_id, path, data }
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
            ClientServerMsg::Disconnect => {
                body.write_u32::<LittleEndian>(0)?;
            }
            ClientServerMsg::Exists { request_id, path, watch } => {
                body.write_u32::<LittleEndian>(1)?;
                body.write_u32::<LittleEndian>(*request_id)?;
                write_str(&mut body, path)?;
                write_bool(&mut body, *watch)?;
            }
            ClientServerMsg::GetData { request_id, path, watch } => {
                body.write_u32::<LittleEndian>(2)?;
                body.write_u32::<LittleEndian>(*request_id)?;
                write_str(&mut body, path)?;
                write_bool(&mut body, *watch)?;
            }
            ClientServerMsg::GetChildren { request_id, path, watch } => {
                body.write_u32::<LittleEndian>(3)?;
                body.write_u32::<LittleEndian>(*request_id)?;
                write_str(&mut body, path)?;
                write_bool(&mut body, *watch)?;
            }
            ClientServerMsg::Create { request_id, path, mode, data } => {
                body.write_u32::<LittleEndian>(4)?;
                body.write_u32::<LittleEndian>(*request_id)?;
                write_str(&mut body, path)?;
                body.write_u32::<LittleEndian>(mode.as_u32())?;
                write_bool(&mut body, data.is_some())?;
                if let Some(data) = data {
                    write_bytes(&mut body, data)?;
                }
            }
            ClientServerMsg::SetData { request_id, path, data } => {
                body.write_u32::<LittleEndian>(5)?;
                body.write_u32::<LittleEndian>(*request_id)?;
                write_str(&mut body, path)?;
                write_bytes(&mut body, data)?;
            }
        }
        write_frame(wtr, &body)
    }
}
