//! Typed messages carried in imsg frames.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::ipc::imsg::{Imsg, ImsgError};
use crate::model::{HostId, HostStatus, TableId};

/// imsg type numbers.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    HostStatus = 1,
    Sync = 2,
    TableEnable = 3,
    TableDisable = 4,
    HostEnable = 5,
    HostDisable = 6,
    CtlReload = 7,
}

impl MessageKind {
    pub fn name(self) -> &'static str {
        match self {
            MessageKind::HostStatus => "HOST_STATUS",
            MessageKind::Sync => "SYNC",
            MessageKind::TableEnable => "TABLE_ENABLE",
            MessageKind::TableDisable => "TABLE_DISABLE",
            MessageKind::HostEnable => "HOST_ENABLE",
            MessageKind::HostDisable => "HOST_DISABLE",
            MessageKind::CtlReload => "CTL_RELOAD",
        }
    }

    fn payload_len(self) -> usize {
        match self {
            MessageKind::HostStatus => 8,
            MessageKind::Sync | MessageKind::CtlReload => 0,
            _ => 4,
        }
    }
}

impl TryFrom<u32> for MessageKind {
    type Error = ImsgError;

    fn try_from(val: u32) -> Result<Self, Self::Error> {
        let kind = match val {
            1 => MessageKind::HostStatus,
            2 => MessageKind::Sync,
            3 => MessageKind::TableEnable,
            4 => MessageKind::TableDisable,
            5 => MessageKind::HostEnable,
            6 => MessageKind::HostDisable,
            7 => MessageKind::CtlReload,
            other => return Err(ImsgError::UnknownType(other)),
        };
        Ok(kind)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Message {
    HostStatus { host: HostId, status: HostStatus },
    Sync,
    TableEnable(TableId),
    TableDisable(TableId),
    HostEnable(HostId),
    HostDisable(HostId),
    Reload,
}

impl Message {
    pub fn kind(&self) -> MessageKind {
        match self {
            Message::HostStatus { .. } => MessageKind::HostStatus,
            Message::Sync => MessageKind::Sync,
            Message::TableEnable(_) => MessageKind::TableEnable,
            Message::TableDisable(_) => MessageKind::TableDisable,
            Message::HostEnable(_) => MessageKind::HostEnable,
            Message::HostDisable(_) => MessageKind::HostDisable,
            Message::Reload => MessageKind::CtlReload,
        }
    }

    pub fn to_imsg(&self) -> Imsg {
        let mut data = BytesMut::with_capacity(self.kind().payload_len());
        match *self {
            Message::HostStatus { host, status } => {
                data.put_u32(host.0);
                data.put_i32(status.to_wire());
            }
            Message::TableEnable(id) | Message::TableDisable(id) => data.put_u32(id.0),
            Message::HostEnable(id) | Message::HostDisable(id) => data.put_u32(id.0),
            Message::Sync | Message::Reload => {}
        }
        Imsg::new(self.kind() as u32, data.freeze())
    }

    pub fn from_imsg(imsg: &Imsg) -> Result<Self, ImsgError> {
        let kind = MessageKind::try_from(imsg.kind)?;
        if imsg.data.len() != kind.payload_len() {
            return Err(ImsgError::PayloadLength {
                kind: kind.name(),
                got: imsg.data.len(),
                expected: kind.payload_len(),
            });
        }

        let mut data: Bytes = imsg.data.clone();
        let msg = match kind {
            MessageKind::HostStatus => {
                let host = HostId(data.get_u32());
                let raw = data.get_i32();
                let status = HostStatus::from_wire(raw).ok_or(ImsgError::InvalidStatus(raw))?;
                Message::HostStatus { host, status }
            }
            MessageKind::Sync => Message::Sync,
            MessageKind::TableEnable => Message::TableEnable(TableId(data.get_u32())),
            MessageKind::TableDisable => Message::TableDisable(TableId(data.get_u32())),
            MessageKind::HostEnable => Message::HostEnable(HostId(data.get_u32())),
            MessageKind::HostDisable => Message::HostDisable(HostId(data.get_u32())),
            MessageKind::CtlReload => Message::Reload,
        };
        Ok(msg)
    }
}
