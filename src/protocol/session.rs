use std::net::TcpStream;

use log::{debug, trace};
use serde_json::Value;
use thiserror::Error;

use crate::config::ClientConfig;

use super::{
    Command, CommandError, Connection, DELIMITER, FramedTransport, GetOptions, Login, PageReply,
    Record, Reply, ServerError, Stats, TransportError,
};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error("malformed '{command}' reply: {reason}")]
    Malformed {
        command: &'static str,
        reason: String,
    },
    #[error("server rejected '{command}': {error}")]
    Rejected {
        command: &'static str,
        error: ServerError,
    },
}

impl SessionError {
    fn malformed(command: &'static str, reason: impl ToString) -> Self {
        SessionError::Malformed {
            command,
            reason: reason.to_string(),
        }
    }
}

/// Reply to a command whose answer must carry a JSON object.
enum Body {
    Data(Record),
    Error(ServerError),
}

/// An open, strictly request-then-reply protocol session.
pub struct Session<C: Connection> {
    transport: FramedTransport<C>,
    login: Login,
}

impl Session<TcpStream> {
    pub fn open(config: &ClientConfig) -> Result<Self, SessionError> {
        let transport = FramedTransport::open(config)?;
        Ok(Self::new(transport, config))
    }
}

impl<C: Connection> Session<C> {
    pub fn new(transport: FramedTransport<C>, config: &ClientConfig) -> Self {
        Self {
            transport,
            login: Login {
                protocol: config.protocol,
                client: config.client.clone(),
                clientver: config.client_version,
            },
        }
    }

    /// Performs one round trip and returns the decoded reply text.
    pub fn query(&mut self, command: &Command) -> Result<String, SessionError> {
        let frame = command.encode()?;
        trace!("-> {}", String::from_utf8_lossy(&frame[..frame.len() - 1]));
        self.transport.send(&frame)?;

        let reply = self.transport.receive(DELIMITER)?;
        let reply = String::from_utf8(reply)
            .map_err(|e| SessionError::malformed(command.name(), e))?;
        trace!("<- {reply}");
        Ok(reply)
    }

    /// Sends `login` and hands back the raw status text, success or not.
    pub fn login(&mut self) -> Result<String, SessionError> {
        let command = Command::Login(self.login.clone());
        let status = self.query(&command)?;
        debug!("login reply: {status}");
        Ok(status)
    }

    pub fn db_stats(&mut self) -> Result<Stats, SessionError> {
        let command = Command::DbStats;
        match self.request(&command)? {
            Body::Data(body) => Ok(Stats::new(body)),
            Body::Error(error) => Err(SessionError::Rejected {
                command: command.name(),
                error,
            }),
        }
    }

    /// Issues `get` and returns either a page of results or an error reply.
    pub fn get(
        &mut self,
        entity: &str,
        flags: &str,
        filter: &str,
        options: GetOptions,
    ) -> Result<PageReply, SessionError> {
        let command = Command::Get {
            entity: entity.to_string(),
            flags: flags.to_string(),
            filter: filter.to_string(),
            options,
        };
        match self.request(&command)? {
            Body::Data(body) => serde_json::from_value(Value::Object(body))
                .map(PageReply::Page)
                .map_err(|e| SessionError::malformed(command.name(), e)),
            Body::Error(error) => Ok(PageReply::Error(error)),
        }
    }

    pub fn set(&mut self, entity: &str, ids: &str, fields: &str) -> Result<String, SessionError> {
        let command = Command::Set {
            entity: entity.to_string(),
            ids: ids.to_string(),
            fields: fields.to_string(),
        };
        self.query(&command)
    }

    pub fn close(self) -> Result<(), SessionError> {
        self.transport.close()?;
        Ok(())
    }

    /// Round trip for commands whose reply must carry a JSON body.
    fn request(&mut self, command: &Command) -> Result<Body, SessionError> {
        let text = self.query(command)?;
        match Reply::parse(&text) {
            Ok(Reply::Data { body, .. }) => Ok(Body::Data(body)),
            Ok(Reply::Error(error)) => Ok(Body::Error(error)),
            Ok(Reply::Status(token)) => Err(SessionError::malformed(
                command.name(),
                format!("missing body after '{token}'"),
            )),
            Err(e) => Err(SessionError::malformed(command.name(), e)),
        }
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &FramedTransport<C> {
        &self.transport
    }
}
