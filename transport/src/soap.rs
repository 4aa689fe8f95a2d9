//! Minimal SOAP client for UPnP control endpoints

use std::sync::Arc;

use tracing::{debug, warn};
use xmltree::Element;

use crate::error::{SoapError, TransportError};
use crate::http::{HttpClient, HttpRequest};

/// Sends SOAP actions to UPnP control URLs through an [`HttpClient`]
#[derive(Clone)]
pub struct SoapClient {
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for SoapClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoapClient").finish_non_exhaustive()
    }
}

impl SoapClient {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }

    /// Wrap an action payload in a SOAP 1.1 envelope
    pub fn envelope(service_type: &str, action: &str, payload: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">
    <s:Body>
        <u:{action} xmlns:u="{service_type}">{payload}</u:{action}>
    </s:Body>
</s:Envelope>"#,
            action = action,
            service_type = service_type,
            payload = payload
        )
    }

    /// Post an action to `control_url` and return the `<Action>Response` element
    pub async fn call(
        &self,
        control_url: &str,
        service_type: &str,
        action: &str,
        payload: &str,
    ) -> Result<Element, SoapError> {
        let body = Self::envelope(service_type, action, payload);
        let soap_action = format!("\"{}#{}\"", service_type, action);

        debug!(action, control_url, "Invoking SOAP action");

        let request = HttpRequest::post(control_url, body)
            .header("Content-Type", "text/xml; charset=\"utf-8\"")
            .header("SOAPAction", soap_action);

        let response = self.http.execute(request).await?;
        let status = response.status();
        let xml_text = response.text()?;

        if !response.is_success() {
            // UPnP errors arrive as a fault body with a 500 status
            if let Ok(xml) = Element::parse(xml_text.as_bytes()) {
                if let Some(fault) = extract_fault(&xml) {
                    warn!(action, control_url, %fault, "SOAP fault");
                    return Err(fault);
                }
            }
            warn!(action, control_url, status, "SOAP call rejected");
            return Err(TransportError::Status {
                status,
                url: control_url.to_string(),
            }
            .into());
        }

        let xml = Element::parse(xml_text.as_bytes())
            .map_err(|e| SoapError::Parse(e.to_string()))?;

        extract_response(&xml, action)
    }
}

/// Find a direct child by local name, ignoring case
pub fn child_ignore_case<'a>(parent: &'a Element, name: &str) -> Option<&'a Element> {
    parent
        .children
        .iter()
        .filter_map(|node| node.as_element())
        .find(|element| element.name.eq_ignore_ascii_case(name))
}

/// Trimmed text of a direct child, if present and non-empty
pub fn child_text(parent: &Element, name: &str) -> Option<String> {
    child_ignore_case(parent, name)
        .and_then(|element| element.get_text())
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn extract_fault(xml: &Element) -> Option<SoapError> {
    let fault = child_ignore_case(xml, "Body").and_then(|body| child_ignore_case(body, "Fault"))?;
    let upnp_error = child_ignore_case(fault, "detail").and_then(|d| child_ignore_case(d, "UPnPError"));

    let code = upnp_error
        .and_then(|e| child_text(e, "errorCode"))
        .and_then(|t| t.parse::<u16>().ok())
        .unwrap_or(500);
    let description = upnp_error
        .and_then(|e| child_text(e, "errorDescription"))
        .or_else(|| child_text(fault, "faultstring"))
        .unwrap_or_default();

    Some(SoapError::Fault { code, description })
}

fn extract_response(xml: &Element, action: &str) -> Result<Element, SoapError> {
    let body = child_ignore_case(xml, "Body")
        .ok_or_else(|| SoapError::Parse("Missing SOAP Body".to_string()))?;

    if let Some(fault) = extract_fault(xml) {
        return Err(fault);
    }

    let response_name = format!("{}Response", action);
    child_ignore_case(body, &response_name)
        .cloned()
        .ok_or_else(|| SoapError::Parse(format!("Missing {} element", response_name)))
}
