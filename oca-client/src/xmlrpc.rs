//! XML-RPC transport over HTTP.
//!
//! Every call is a `methodCall` whose first parameter is the session string.
//! The control plane answers with a single array parameter
//! `[success, body, error_code]`; a failed call carries its error message in
//! `body`. Protocol level errors come back as a `<fault>`.

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use oca_template::xml::escape;
use oca_template::{TemplateError, Token, XmlReader};

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::transport::{CallArg, Transport};

/// A decoded XML-RPC value.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlRpcValue {
    Int(i64),
    Bool(bool),
    Double(f64),
    Str(String),
    Array(Vec<XmlRpcValue>),
    Struct(Vec<(String, XmlRpcValue)>),
}

impl XmlRpcValue {
    /// Scalar rendered as text; `None` for arrays and structs.
    pub fn as_text(&self) -> Option<String> {
        match self {
            XmlRpcValue::Int(v) => Some(v.to_string()),
            XmlRpcValue::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
            XmlRpcValue::Double(v) => Some(v.to_string()),
            XmlRpcValue::Str(s) => Some(s.clone()),
            XmlRpcValue::Array(_) | XmlRpcValue::Struct(_) => None,
        }
    }

    /// Look up a struct member.
    pub fn member(&self, name: &str) -> Option<&XmlRpcValue> {
        match self {
            XmlRpcValue::Struct(members) => members
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value),
            _ => None,
        }
    }
}

/// A decoded `methodResponse`.
#[derive(Debug, Clone, PartialEq)]
pub enum MethodResponse {
    Params(Vec<XmlRpcValue>),
    Fault(XmlRpcValue),
}

/// Encode a `methodCall` with the session as first parameter.
pub fn encode_call(method: &str, session: &str, args: &[CallArg]) -> String {
    let mut xml = String::from("<?xml version=\"1.0\"?>\n<methodCall><methodName>");
    xml.push_str(&escape(method));
    xml.push_str("</methodName><params>");

    push_param(&mut xml, &CallArg::Str(session.to_string()));
    for arg in args {
        push_param(&mut xml, arg);
    }

    xml.push_str("</params></methodCall>");
    xml
}

fn push_param(xml: &mut String, arg: &CallArg) {
    xml.push_str("<param><value>");
    match arg {
        CallArg::Int(v) => xml.push_str(&format!("<i4>{}</i4>", v)),
        CallArg::Bool(b) => xml.push_str(&format!("<boolean>{}</boolean>", u8::from(*b))),
        CallArg::Str(s) => {
            xml.push_str("<string>");
            xml.push_str(&escape(s));
            xml.push_str("</string>");
        }
    }
    xml.push_str("</value></param>");
}

/// Parse a `methodResponse` document.
pub fn parse_response(xml: &str) -> oca_template::Result<MethodResponse> {
    let mut reader = XmlReader::new(xml);
    let root = reader.expect_root()?;
    if root != "methodResponse" {
        return Err(TemplateError::Parse(format!(
            "expected <methodResponse>, found <{}>",
            root
        )));
    }

    let mut response = None;
    reader.read_children(&root, |r, child| {
        match child.as_str() {
            "params" => {
                let mut values = Vec::new();
                r.read_children("params", |r, param| {
                    if param != "param" {
                        return r.skip_element(&param);
                    }
                    r.read_children("param", |r, value| {
                        if value == "value" {
                            values.push(read_value(r)?);
                            Ok(())
                        } else {
                            r.skip_element(&value)
                        }
                    })
                })?;
                response = Some(MethodResponse::Params(values));
            }
            "fault" => {
                let mut fault = XmlRpcValue::Str(String::new());
                r.read_children("fault", |r, value| {
                    if value == "value" {
                        fault = read_value(r)?;
                        Ok(())
                    } else {
                        r.skip_element(&value)
                    }
                })?;
                response = Some(MethodResponse::Fault(fault));
            }
            _ => r.skip_element(&child)?,
        }
        Ok(())
    })?;

    response.ok_or_else(|| TemplateError::Parse("empty <methodResponse>".to_string()))
}

/// Read a `<value>` whose start tag was consumed. Untyped content is a string.
fn read_value(reader: &mut XmlReader<'_>) -> oca_template::Result<XmlRpcValue> {
    let mut text = String::new();

    loop {
        match reader.next_token()? {
            Token::Text(chunk) => text.push_str(&chunk),
            Token::Start(kind) => {
                let value = read_typed(reader, &kind)?;
                reader.read_children("value", |r, extra| r.skip_element(&extra))?;
                return Ok(value);
            }
            Token::End(name) if name == "value" => return Ok(XmlRpcValue::Str(text)),
            other => return Err(reader.unexpected(&other, "the content of <value>")),
        }
    }
}

fn read_typed(reader: &mut XmlReader<'_>, kind: &str) -> oca_template::Result<XmlRpcValue> {
    match kind {
        "i4" | "int" | "i8" => Ok(XmlRpcValue::Int(reader.read_parsed(kind)?)),
        "double" => Ok(XmlRpcValue::Double(reader.read_parsed(kind)?)),
        "boolean" => match reader.read_text(kind)?.trim() {
            "1" => Ok(XmlRpcValue::Bool(true)),
            "0" => Ok(XmlRpcValue::Bool(false)),
            other => Err(TemplateError::TypeMismatch(format!(
                "invalid boolean {:?}",
                other
            ))),
        },
        "array" => {
            let mut items = Vec::new();
            reader.read_children("array", |r, data| {
                if data != "data" {
                    return r.skip_element(&data);
                }
                r.read_children("data", |r, value| {
                    if value == "value" {
                        items.push(read_value(r)?);
                        Ok(())
                    } else {
                        r.skip_element(&value)
                    }
                })
            })?;
            Ok(XmlRpcValue::Array(items))
        }
        "struct" => {
            let mut members = Vec::new();
            reader.read_children("struct", |r, member| {
                if member != "member" {
                    return r.skip_element(&member);
                }
                let mut name = String::new();
                let mut value = XmlRpcValue::Str(String::new());
                r.read_children("member", |r, field| match field.as_str() {
                    "name" => {
                        name = r.read_text("name")?;
                        Ok(())
                    }
                    "value" => {
                        value = read_value(r)?;
                        Ok(())
                    }
                    _ => r.skip_element(&field),
                })?;
                members.push((name, value));
                Ok(())
            })?;
            Ok(XmlRpcValue::Struct(members))
        }
        // string, dateTime.iso8601, base64, nil
        _ => Ok(XmlRpcValue::Str(reader.read_text(kind)?)),
    }
}

/// Decode a response into the call body, or the control plane's error.
pub fn decode_response(xml: &str) -> Result<String> {
    let response = parse_response(xml).map_err(|e| ClientError::Response(e.to_string()))?;

    match response {
        MethodResponse::Fault(fault) => {
            let message = fault
                .member("faultString")
                .and_then(XmlRpcValue::as_text)
                .or_else(|| fault.as_text())
                .unwrap_or_else(|| "XML-RPC fault".to_string());
            Err(ClientError::Transport(message))
        }
        MethodResponse::Params(values) => match values.into_iter().next() {
            Some(XmlRpcValue::Array(items)) => decode_result_array(items),
            Some(other) => other
                .as_text()
                .ok_or_else(|| ClientError::Response("unexpected struct response".to_string())),
            None => Err(ClientError::Response("response has no parameters".to_string())),
        },
    }
}

fn decode_result_array(items: Vec<XmlRpcValue>) -> Result<String> {
    let mut items = items.into_iter();

    let success = match items.next() {
        Some(XmlRpcValue::Bool(b)) => b,
        Some(XmlRpcValue::Int(v)) => v != 0,
        other => {
            return Err(ClientError::Response(format!(
                "expected a success flag, found {:?}",
                other
            )))
        }
    };

    let body = items
        .next()
        .and_then(|value| value.as_text())
        .unwrap_or_default();

    if success {
        Ok(body)
    } else {
        Err(ClientError::Transport(body))
    }
}

/// Transport speaking XML-RPC to the control plane endpoint.
pub struct XmlRpcTransport {
    endpoint: String,
    session: String,
    client: reqwest::Client,
}

impl XmlRpcTransport {
    /// Create a transport from a validated configuration.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()?;

        info!(endpoint = %config.endpoint, "Created XML-RPC transport");

        Ok(Self {
            endpoint: config.endpoint.clone(),
            session: config.session.clone(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for XmlRpcTransport {
    #[instrument(skip(self, args), fields(method = %method, args = args.len()))]
    async fn call(&self, method: &str, args: Vec<CallArg>) -> Result<String> {
        let request = encode_call(method, &self.session, &args);

        let response = self
            .client
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "text/xml")
            .body(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::Transport(format!(
                "[{}] endpoint returned HTTP {}",
                method,
                response.status()
            )));
        }

        let body = response.text().await?;
        debug!(bytes = body.len(), "Received response");

        decode_response(&body)
    }
}
