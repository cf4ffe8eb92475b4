// SPDX-FileCopyrightText: Copyright (c) 2017-2024 slowtec GmbH <post@slowtec.de>
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A Modbus TCP server that answers with a fixed script.

use std::{
    io::{self, Read as _, Write as _},
    net::{SocketAddr, TcpListener, TcpStream},
    thread::{self, JoinHandle},
    time::Duration,
};

/// How the server answers a single request.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Read response carrying these words.
    Registers(Vec<u16>),
    /// Echo of a write request.
    Echo,
    /// Exception response with this code.
    Exception(u8),
    /// The complete frame, sent as is.
    Raw(Vec<u8>),
    /// No answer at all, the connection stays open until the client leaves.
    Silent,
}

pub struct Responder {
    addr: SocketAddr,
    handle: JoinHandle<io::Result<Vec<Vec<u8>>>>,
}

impl Responder {
    pub fn spawn(script: Vec<Reply>) -> io::Result<Self> {
        let _ = env_logger::builder().is_test(true).try_init();
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept()?;
            serve(stream, script)
        });
        Ok(Self { addr, handle })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Waits until the client disconnected and returns all received request frames.
    pub fn join(self) -> Vec<Vec<u8>> {
        self.handle.join().unwrap().unwrap()
    }
}

fn read_frame(stream: &mut TcpStream) -> io::Result<Option<Vec<u8>>> {
    let mut frame = vec![0; 7];
    match stream.read_exact(&mut frame) {
        Ok(()) => (),
        Err(err) if err.kind() == io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err),
    }
    let len = usize::from(u16::from_be_bytes([frame[4], frame[5]]));
    frame.resize(6 + len, 0);
    stream.read_exact(&mut frame[7..])?;
    Ok(Some(frame))
}

fn response_frame(request: &[u8], pdu: &[u8]) -> Vec<u8> {
    let len = u16::try_from(pdu.len() + 1).unwrap();
    let mut frame = request[..4].to_vec();
    frame.extend_from_slice(&len.to_be_bytes());
    frame.push(request[6]);
    frame.extend_from_slice(pdu);
    frame
}

fn serve(mut stream: TcpStream, script: Vec<Reply>) -> io::Result<Vec<Vec<u8>>> {
    stream.set_read_timeout(Some(Duration::from_secs(10)))?;
    let mut requests = Vec::new();
    for reply in script {
        let Some(request) = read_frame(&mut stream)? else {
            return Ok(requests);
        };
        let function = request[7];
        let answer = match reply {
            Reply::Registers(words) => {
                let mut pdu = vec![function, u8::try_from(words.len() * 2).unwrap()];
                for word in words {
                    pdu.extend_from_slice(&word.to_be_bytes());
                }
                Some(response_frame(&request, &pdu))
            }
            Reply::Echo => {
                // Address and value, or address and quantity
                Some(response_frame(&request, &request[7..12]))
            }
            Reply::Exception(code) => Some(response_frame(&request, &[function | 0x80, code])),
            Reply::Raw(frame) => Some(frame),
            Reply::Silent => None,
        };
        requests.push(request);
        match answer {
            Some(frame) => stream.write_all(&frame)?,
            None => break,
        }
    }
    // Wait for the client to disconnect.
    let _ = stream.read_to_end(&mut Vec::new());
    Ok(requests)
}
