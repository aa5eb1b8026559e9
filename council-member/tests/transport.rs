//! Transport tests over real localhost sockets, plus a small three-node
//! cluster exercising the whole stack end to end.

use std::net::TcpListener as StdTcpListener;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec};

use council_core::{ClusterConfig, MemberId, Message, MessageKind, codec};
use council_member::{TcpTransport, TransportError};
use council_paxos::{Node, SendError, Transport, drive};

/// Reserves `n` distinct localhost ports.
fn free_ports(n: usize) -> Vec<u16> {
    let listeners: Vec<_> = (0..n)
        .map(|_| StdTcpListener::bind("127.0.0.1:0").expect("bind ephemeral"))
        .collect();
    listeners
        .iter()
        .map(|l| l.local_addr().expect("local addr").port())
        .collect()
}

fn config_for(ids: &[&str], ports: &[u16]) -> Arc<ClusterConfig> {
    let text: String = ids
        .iter()
        .zip(ports)
        .map(|(id, port)| format!("{id},127.0.0.1,{port}\n"))
        .collect();
    Arc::new(ClusterConfig::parse(&text).expect("valid config"))
}

fn prepare(from: &str, counter: u64) -> Message {
    Message::new(
        MessageKind::Prepare,
        MemberId::from(from),
        Some(council_core::ProposalNumber::new(counter, MemberId::from(from))),
        None,
    )
}

#[tokio::test(flavor = "multi_thread")]
async fn send_delivers_one_message() {
    let ports = free_ports(2);
    let config = config_for(&["M1", "M2"], &ports);

    let sender = TcpTransport::new(MemberId::from("M1"), Arc::clone(&config)).expect("configured");
    let receiver = TcpTransport::new(MemberId::from("M2"), Arc::clone(&config)).expect("configured");

    let _sender_inbound = sender.start().await.expect("bind");
    let mut inbound = receiver.start().await.expect("bind");

    let message = prepare("M1", 7);
    sender.send(&MemberId::from("M2"), &message).await.expect("deliverable");

    let received = tokio::time::timeout(Duration::from_secs(5), inbound.recv())
        .await
        .expect("timely")
        .expect("channel open");
    assert_eq!(received, message);
}

#[tokio::test(flavor = "multi_thread")]
async fn send_to_unknown_peer_fails() {
    let ports = free_ports(1);
    let config = config_for(&["M1"], &ports);
    let transport = TcpTransport::new(MemberId::from("M1"), config).expect("configured");

    let result = transport.send(&MemberId::from("M9"), &prepare("M1", 1)).await;
    assert!(matches!(result, Err(SendError::UnknownPeer(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn unknown_self_id_is_rejected() {
    let ports = free_ports(1);
    let config = config_for(&["M1"], &ports);
    assert!(matches!(
        TcpTransport::new(MemberId::from("M9"), config),
        Err(TransportError::UnknownSelf(_))
    ));
}

#[tokio::test(flavor = "multi_thread")]
async fn broadcast_skips_self_and_survives_a_dead_peer() {
    let ports = free_ports(3);
    let config = config_for(&["M1", "M2", "M3"], &ports);

    let sender = TcpTransport::new(MemberId::from("M1"), Arc::clone(&config)).expect("configured");
    let listener = TcpTransport::new(MemberId::from("M2"), Arc::clone(&config)).expect("configured");

    let mut sender_inbound = sender.start().await.expect("bind");
    let mut inbound = listener.start().await.expect("bind");
    // M3 is never started: its port is dead and the broadcast must shrug.

    sender.broadcast(&prepare("M1", 3)).await;

    let received = tokio::time::timeout(Duration::from_secs(5), inbound.recv())
        .await
        .expect("timely")
        .expect("channel open");
    assert_eq!(received.kind, MessageKind::Prepare);

    // nothing looped back to the sender
    assert!(
        tokio::time::timeout(Duration::from_millis(200), sender_inbound.recv())
            .await
            .is_err()
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_lines_are_dropped_but_acked() {
    let ports = free_ports(1);
    let config = config_for(&["M1"], &ports);
    let transport = TcpTransport::new(MemberId::from("M1"), Arc::clone(&config)).expect("configured");
    let mut inbound = transport.start().await.expect("bind");

    let stream = TcpStream::connect(("127.0.0.1", ports[0])).await.expect("connect");
    let mut framed = Framed::new(stream, LinesCodec::new());
    framed.send("this is not a message").await.expect("write");
    let ack = framed.next().await.expect("ack present").expect("ack readable");
    assert_eq!(ack, "OK");

    assert!(
        tokio::time::timeout(Duration::from_millis(200), inbound.recv())
            .await
            .is_err()
    );
}

#[tokio::test(flavor = "multi_thread")]
async fn connection_without_a_line_is_tolerated() {
    let ports = free_ports(1);
    let config = config_for(&["M1"], &ports);
    let transport = TcpTransport::new(MemberId::from("M1"), Arc::clone(&config)).expect("configured");
    let mut inbound = transport.start().await.expect("bind");

    drop(TcpStream::connect(("127.0.0.1", ports[0])).await.expect("connect"));

    // the endpoint keeps serving afterwards
    let stream = TcpStream::connect(("127.0.0.1", ports[0])).await.expect("connect");
    let mut framed = Framed::new(stream, LinesCodec::new());
    framed.send(codec::encode(&prepare("M1", 2))).await.expect("write");
    let received = tokio::time::timeout(Duration::from_secs(5), inbound.recv())
        .await
        .expect("timely")
        .expect("channel open");
    assert_eq!(received.kind, MessageKind::Prepare);
}

/// Three real nodes over localhost TCP elect a president.
#[tokio::test(flavor = "multi_thread")]
async fn three_node_cluster_reaches_consensus() {
    let ports = free_ports(3);
    let ids = ["M1", "M2", "M3"];
    let config = config_for(&ids, &ports);

    let mut nodes = Vec::new();
    for id in ids {
        let node = Arc::new(Node::new(MemberId::from(id), Arc::clone(&config)));
        let transport = Arc::new(
            TcpTransport::new(MemberId::from(id), Arc::clone(&config)).expect("configured"),
        );
        let mut inbound = transport.start().await.expect("bind");

        // same dispatch loop as the binary: one worker task per message
        {
            let node = Arc::clone(&node);
            let transport = Arc::clone(&transport);
            tokio::spawn(async move {
                while let Some(message) = inbound.recv().await {
                    let node = Arc::clone(&node);
                    let transport = Arc::clone(&transport);
                    tokio::spawn(async move {
                        let step = node.handle(&message);
                        drive(transport.as_ref(), step).await;
                    });
                }
            });
        }
        nodes.push((node, transport));
    }

    let (proposer, transport) = &nodes[0];
    let step = proposer.propose("M2").expect("known candidate");
    drive(transport.as_ref(), step).await;

    let everyone_decided = async {
        loop {
            if nodes
                .iter()
                .all(|(node, _)| node.learner().decision().is_some())
            {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(10), everyone_decided)
        .await
        .expect("cluster should decide");

    for (node, _) in &nodes {
        assert_eq!(node.learner().decision().as_deref(), Some("M2"));
    }

    for (_, transport) in &nodes {
        transport.close();
    }
}
