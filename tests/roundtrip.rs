use crate::common::RecordingListener;
use futures::executor::block_on;
use futures::io::Cursor;
use ws_framing::frame::toggle_mask;
use ws_framing::message::WsMessageKind;
use ws_framing::reader::{WsFrameReader, WsReadError};
use ws_framing::writer::WsFrameWriter;
use ws_framing::WsRole;

mod common;

#[test]
fn mask_is_an_involution() {
    let original: Vec<u8> = (0..=255).collect();
    let mut payload = original.clone();
    let key = [0x37, 0xfa, 0x21, 0x3d];
    toggle_mask(key, 0, &mut payload);
    assert_ne!(payload, original);
    toggle_mask(key, 0, &mut payload);
    assert_eq!(payload, original);
}

#[test]
fn mask_offset_makes_split_application_equivalent() {
    let mut whole = b"The quick brown fox jumps over the lazy dog".to_vec();
    let mut split = whole.clone();
    let key = [1, 2, 3, 4];
    toggle_mask(key, 0, &mut whole);
    let (head, tail) = split.split_at_mut(7);
    toggle_mask(key, 0, head);
    toggle_mask(key, 7, tail);
    assert_eq!(whole, split);
}

fn read_all(bytes: Vec<u8>, role: WsRole) -> WsFrameReader<Cursor<Vec<u8>>, RecordingListener> {
    let mut reader = WsFrameReader::new(role, Cursor::new(bytes), RecordingListener::default());
    loop {
        match block_on(reader.read_message()) {
            Ok(()) => {}
            // The peer's close frame is consumed while looking for the next
            // message; the transport then runs dry.
            Err(WsReadError::Io(_)) => return reader,
            Err(err) => panic!("unexpected error: {:?}", err),
        }
    }
}

#[test]
fn client_to_server_roundtrip() {
    let writer = WsFrameWriter::new(WsRole::Client, Cursor::new(Vec::new()));
    block_on(async {
        writer
            .send_message(b"Hello", WsMessageKind::Text)
            .await
            .unwrap();
        let mut message = writer.message_writer(WsMessageKind::Binary).unwrap();
        message.write(&[1, 2, 3]).await.unwrap();
        writer.write_ping(b"keepalive").await.unwrap();
        message.write(&[4, 5]).await.unwrap();
        message.close().await.unwrap();
        writer.write_close(1000, Some("done")).await.unwrap();
    });
    let bytes = writer.into_inner().unwrap().into_inner();

    let reader = read_all(bytes, WsRole::Server);
    let listener = reader.listener();
    assert_eq!(
        listener.messages,
        vec![
            (WsMessageKind::Text, b"Hello".to_vec()),
            (WsMessageKind::Binary, vec![1, 2, 3, 4, 5]),
        ]
    );
    assert_eq!(listener.pings, vec![b"keepalive".to_vec()]);
    assert_eq!(listener.closes, vec![(1000, b"done".to_vec())]);
}

#[test]
fn server_to_client_roundtrip() {
    let writer = WsFrameWriter::new(WsRole::Server, Cursor::new(Vec::new()));
    block_on(async {
        let mut message = writer.message_writer(WsMessageKind::Text).unwrap();
        message.write(b"Hel").await.unwrap();
        message.write(b"lo").await.unwrap();
        message.close().await.unwrap();
        writer.write_pong(b"ok").await.unwrap();
        writer
            .send_message(b"Hey!", WsMessageKind::Text)
            .await
            .unwrap();
        writer.write_close(0, None).await.unwrap();
    });
    let bytes = writer.into_inner().unwrap().into_inner();

    let reader = read_all(bytes, WsRole::Client);
    let listener = reader.listener();
    assert_eq!(
        listener.messages,
        vec![
            (WsMessageKind::Text, b"Hello".to_vec()),
            (WsMessageKind::Text, b"Hey!".to_vec()),
        ]
    );
    assert_eq!(listener.pongs, vec![b"ok".to_vec()]);
    assert_eq!(listener.closes, vec![(0, Vec::new())]);
}

#[test]
fn large_masked_message_survives_scratch_chunking() {
    let payload: Vec<u8> = (0..70_000).map(|i| (i % 251) as u8).collect();
    let writer = WsFrameWriter::new(WsRole::Client, Cursor::new(Vec::new()));
    block_on(writer.send_message(&payload, WsMessageKind::Binary)).unwrap();
    let bytes = writer.into_inner().unwrap().into_inner();

    let mut reader = WsFrameReader::new(
        WsRole::Server,
        Cursor::new(bytes),
        RecordingListener::default(),
    );
    block_on(reader.read_message()).unwrap();
    assert_eq!(
        reader.listener().messages,
        vec![(WsMessageKind::Binary, payload)]
    );
}
