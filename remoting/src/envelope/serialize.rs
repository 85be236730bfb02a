use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    EncodeError,
    amf3::{AVMPLUS, Amf3EncoderState},
    envelope::{Message, MessageBody},
};

impl Message {
    pub fn serialize(&self) -> Result<Bytes, EncodeError> {
        if self.bodies.len() > u16::MAX as usize {
            return Err(EncodeError::TooManyBodies(self.bodies.len()));
        }

        let mut encoder = Amf3EncoderState::new(BytesMut::new());
        encoder.buf.put_u16(self.version);
        // no headers
        encoder.buf.put_u16(0);
        encoder.buf.put_u16(self.bodies.len() as u16);

        for body in &self.bodies {
            body.serialize_into(&mut encoder)?;
        }
        Ok(encoder.into_inner().freeze())
    }
}

impl MessageBody {
    fn serialize_into(&self, encoder: &mut Amf3EncoderState<BytesMut>) -> Result<(), EncodeError> {
        encoder.put_utf(&self.target_uri, false)?;
        encoder.put_utf(&self.response_uri, false)?;

        let mut body_encoder = Amf3EncoderState::new(BytesMut::new());
        body_encoder.buf.put_u8(AVMPLUS);
        body_encoder.put_value(&self.value)?;
        let body = body_encoder.into_inner();

        if body.len() > u32::MAX as usize {
            return Err(EncodeError::BodyTooLarge(body.len()));
        }
        encoder.buf.put_u32(body.len() as u32);
        encoder.buf.put_slice(&body);
        Ok(())
    }
}
