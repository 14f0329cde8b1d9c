//! # Envelope Integration Tests
//!
//! The wire format as seen at the module boundary: bytes published onto the
//! bus and bytes handed to `receive_serialized`.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use gateway_bus::{BusError, MessageBus};
    use gateway_types::{CodecError, Message, Module, ModuleHandle, Properties};

    use crate::integration::support::{wait_until, Recorder};

    /// `Hello!!!` with a single `Key1=Value1` property, as another host
    /// would put it on the wire.
    fn foreign_envelope() -> Vec<u8> {
        let mut v = vec![0xA1, 0x60, 0x00, 0x00, 0x00, 0x22, 0x00, 0x00, 0x00, 0x01];
        v.extend_from_slice(b"Key1\0Value1\0");
        v.extend_from_slice(&[0x00, 0x00, 0x00, 0x08]);
        v.extend_from_slice(b"Hello!!!");
        v
    }

    #[tokio::test]
    async fn test_foreign_envelope_published_on_bus() {
        let bus = MessageBus::new();
        let handle = ModuleHandle::new();
        let sink = Arc::new(Recorder::new("sink", handle));
        bus.add_module(handle, sink.clone()).unwrap();

        let queued = bus
            .publish_serialized(ModuleHandle::new(), &foreign_envelope())
            .unwrap();
        assert_eq!(queued, 1);
        assert!(wait_until(|| sink.seen_count() == 1).await);

        let message = &sink.seen()[0];
        assert_eq!(message.content(), b"Hello!!!");
        assert_eq!(message.property("Key1"), Some("Value1"));

        // Re-encoding gives back the exact bytes
        assert_eq!(message.to_bytes().unwrap(), foreign_envelope());
        bus.shutdown().await;
    }

    #[tokio::test]
    async fn test_corrupt_envelope_never_delivered() {
        let bus = MessageBus::new();
        let handle = ModuleHandle::new();
        let sink = Arc::new(Recorder::new("sink", handle));
        bus.add_module(handle, sink.clone()).unwrap();

        let mut corrupt = foreign_envelope();
        corrupt.push(0xFF);
        assert_eq!(
            bus.publish_serialized(ModuleHandle::new(), &corrupt),
            Err(BusError::Codec(CodecError::SizeMismatch {
                declared: 0x22,
                actual: 0x23
            }))
        );

        bus.publish(ModuleHandle::new(), Message::from_text("marker", Properties::new()))
            .unwrap();
        assert!(wait_until(|| sink.seen_count() == 1).await);
        assert_eq!(sink.seen()[0].content_str(), "marker");
        bus.shutdown().await;
    }

    #[tokio::test]
    async fn test_receive_serialized_at_module_boundary() {
        let module = Recorder::new("direct", ModuleHandle::new());

        module.receive_serialized(&foreign_envelope()).await.unwrap();
        assert_eq!(module.seen_count(), 1);

        let err = module.receive_serialized(b"not an envelope").await.unwrap_err();
        assert!(matches!(err, CodecError::BadHeader { .. }));
        assert_eq!(module.seen_count(), 1);
    }

    #[tokio::test]
    async fn test_context_publishes_envelope_from_module() {
        let bus = MessageBus::new();
        let (sender, receiver) = (ModuleHandle::new(), ModuleHandle::new());
        let sender_module = Arc::new(Recorder::new("sender", sender));
        let receiver_module = Arc::new(Recorder::new("receiver", receiver));
        bus.add_module(sender, sender_module.clone()).unwrap();
        bus.add_module(receiver, receiver_module.clone()).unwrap();

        let context = bus.context(sender, "");
        assert_eq!(context.publish_serialized(&foreign_envelope()).unwrap(), 1);

        assert!(wait_until(|| receiver_module.seen_count() == 1).await);
        bus.shutdown().await;
        assert_eq!(sender_module.seen_count(), 0);
    }
}
