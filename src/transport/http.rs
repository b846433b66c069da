//! MAPI/HTTP backend: one POST per operation to the address-book endpoint.

use bytes::Bytes;
use tracing::{debug, instrument, trace};
use uuid::Uuid;

use crate::protocol::{
    BinaryArray, FlatUid, Operation, PropertyRow, PropertyRowSet, PropertyTag, PropertyTagArray,
    PropertyValue, Stat, StringArray, WStringArray, WireDecode,
};

use super::backend::{
    BackendKind, GetMatchesRequest, MatchSet, NspiBackend, Positioned, Reply, SpecialTable,
};
use super::body::{
    BindResponse, CompareMidsResponse, MatchesResponse, RequestBody, ResolveNamesResponse,
    ResortResponse, RowResponse, SpecialTableResponse, StatusResponse, TableResponse,
    TagsResponse, UpdateStatResponse, decode_response,
};
use super::chunked::ChunkedResponse;
use super::error::TransportError;
use super::session::{CookieJar, HttpSession};

/// Media type of MAPI/HTTP request and response bodies.
pub const CONTENT_TYPE: &str = "application/mapi-http";

/// HTTP endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HttpConfig {
    /// Address-book endpoint URL.
    pub address_book_url: String,
    /// Value of `X-ClientApplication`.
    pub client_application: String,
    /// Value of `X-ClientInfo`.
    pub client_info: String,
    /// Opaque `Authorization` header value.
    pub authorization: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address_book_url: "https://localhost/mapi/nspi/".to_owned(),
            client_application: concat!("nspi-client/", env!("CARGO_PKG_VERSION")).to_owned(),
            client_info: format!("{{{}}}", Uuid::new_v4().hyphenated()),
            authorization: None,
        }
    }
}

impl HttpConfig {
    /// Endpoint URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.address_book_url = url.into();
        self
    }

    /// Authorization header value.
    #[must_use]
    pub fn with_authorization(mut self, value: impl Into<String>) -> Self {
        self.authorization = Some(value.into());
        self
    }
}

/// An outbound POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Target URL.
    pub url: String,
    /// Header name/value pairs in order.
    pub headers: Vec<(String, String)>,
    /// Request body.
    pub body: Bytes,
}

impl HttpRequest {
    /// First header with this name, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// A received response.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HttpResponse {
    /// Status line code.
    pub status: u16,
    /// Header name/value pairs in order; repeated headers stay repeated.
    pub headers: Vec<(String, String)>,
    /// Raw body.
    pub body: Bytes,
}

impl HttpResponse {
    /// First header with this name, compared case-insensitively.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Every value of a repeated header.
    pub fn header_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Something that can carry one HTTP request/response exchange.
pub trait HttpExchange {
    /// Send `request` and wait for the full response.
    fn send(&mut self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

impl<E: HttpExchange + ?Sized> HttpExchange for Box<E> {
    fn send(&mut self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        (**self).send(request)
    }
}

/// Backend speaking NSPI over MAPI/HTTP.
#[derive(Debug)]
pub struct HttpBackend<E> {
    exchange: E,
    config: HttpConfig,
    session: Option<HttpSession>,
}

impl<E: HttpExchange> HttpBackend<E> {
    /// Create an unbound backend.
    pub fn new(exchange: E, config: HttpConfig) -> Self {
        Self {
            exchange,
            config,
            session: None,
        }
    }

    /// Session context currently held.
    #[must_use]
    pub fn session(&self) -> Option<&HttpSession> {
        self.session.as_ref()
    }

    /// Underlying exchanger.
    pub fn exchange(&self) -> &E {
        &self.exchange
    }

    /// Underlying exchanger, mutably.
    pub fn exchange_mut(&mut self) -> &mut E {
        &mut self.exchange
    }

    fn build_request(
        config: &HttpConfig,
        session: &mut HttpSession,
        request_type: &str,
        body: Bytes,
    ) -> HttpRequest {
        let mut headers = vec![
            ("Content-Type".to_owned(), CONTENT_TYPE.to_owned()),
            ("Accept".to_owned(), CONTENT_TYPE.to_owned()),
            ("X-RequestType".to_owned(), request_type.to_owned()),
            ("X-RequestId".to_owned(), session.next_request_id()),
            ("X-ClientInfo".to_owned(), config.client_info.clone()),
            (
                "X-ClientApplication".to_owned(),
                config.client_application.clone(),
            ),
        ];
        if let Some(cookie) = session.cookies().header_value() {
            headers.push(("Cookie".to_owned(), cookie));
        }
        if let Some(auth) = &config.authorization {
            headers.push(("Authorization".to_owned(), auth.clone()));
        }
        HttpRequest {
            url: config.address_book_url.clone(),
            headers,
            body,
        }
    }

    /// Send one request in the current session and decode its response body.
    #[instrument(level = "debug", skip(self, body), fields(operation = %body.operation()))]
    fn post<T: WireDecode>(&mut self, body: RequestBody<'_>) -> Result<T, TransportError> {
        let operation = body.operation();
        let request_type = operation
            .request_type()
            .ok_or(TransportError::Unsupported { operation })?;
        let session = self.session.as_mut().ok_or(TransportError::NoSession)?;

        let request = Self::build_request(&self.config, session, request_type, body.to_bytes()?);
        trace!(len = request.body.len(), "mapi/http request");
        let response = self.exchange.send(&request)?;
        trace!(status = response.status, len = response.body.len(), "mapi/http response");

        session.replace_cookies(CookieJar::from_set_cookie(response.header_values("Set-Cookie")));

        if !(200..300).contains(&response.status) {
            return Err(TransportError::HttpStatus {
                status: response.status,
            });
        }
        match response.header("X-ResponseCode") {
            Some(code) if code.trim() == "0" => {}
            other => {
                return Err(TransportError::ResponseCode {
                    value: other.map(str::to_owned),
                });
            }
        }

        let envelope = ChunkedResponse::parse(&response.body)?;
        decode_response(envelope.body())
    }
}

impl<E: HttpExchange> NspiBackend for HttpBackend<E> {
    fn kind(&self) -> BackendKind {
        BackendKind::Http
    }

    fn has_session(&self) -> bool {
        self.session.is_some()
    }

    fn bind(
        &mut self,
        flags: u32,
        stat: &Stat,
        _server_guid: Option<FlatUid>,
    ) -> Result<Reply<Option<FlatUid>>, TransportError> {
        self.session = Some(HttpSession::new());
        let result = self.post::<BindResponse>(RequestBody::Bind { flags, stat });
        match result {
            Ok(response) if response.error_code == 0 => {
                debug!(
                    cookies = self.session.as_ref().map_or(0, |s| s.cookies().len()),
                    "mapi/http session opened"
                );
                Ok(Reply::new(0, Some(response.server_guid)))
            }
            Ok(response) => {
                self.session = None;
                Ok(Reply::new(response.error_code, None))
            }
            Err(err) => {
                self.session = None;
                Err(err)
            }
        }
    }

    fn unbind(&mut self) -> Result<u32, TransportError> {
        let result = self.post::<StatusResponse>(RequestBody::Unbind);
        // The cookie context is dropped whatever the server says.
        self.session = None;
        let code = result?.error_code;
        debug!(code, "mapi/http session closed");
        Ok(code)
    }

    fn get_special_table(
        &mut self,
        flags: u32,
        stat: &Stat,
        version: u32,
    ) -> Result<Reply<SpecialTable>, TransportError> {
        let r: SpecialTableResponse = self.post(RequestBody::GetSpecialTable {
            flags,
            stat,
            version,
        })?;
        Ok(Reply::new(
            r.error_code,
            SpecialTable {
                version: r.version,
                rows: r.rows,
            },
        ))
    }

    fn update_stat(
        &mut self,
        stat: &Stat,
        delta_requested: bool,
    ) -> Result<Reply<Positioned<Option<i32>>>, TransportError> {
        let r: UpdateStatResponse = self.post(RequestBody::UpdateStat {
            stat,
            delta_requested,
        })?;
        Ok(Reply::new(r.error_code, Positioned::new(r.stat, r.delta)))
    }

    fn query_columns(&mut self, flags: u32) -> Result<Reply<Option<PropertyTagArray>>, TransportError> {
        let r: TagsResponse = self.post(RequestBody::QueryColumns { flags })?;
        Ok(Reply::new(r.error_code, r.tags))
    }

    fn get_prop_list(
        &mut self,
        flags: u32,
        mid: u32,
        code_page: u32,
    ) -> Result<Reply<Option<PropertyTagArray>>, TransportError> {
        let r: TagsResponse = self.post(RequestBody::GetPropList {
            flags,
            mid,
            code_page,
        })?;
        Ok(Reply::new(r.error_code, r.tags))
    }

    fn get_props(
        &mut self,
        flags: u32,
        stat: &Stat,
        tags: Option<&PropertyTagArray>,
    ) -> Result<Reply<Option<PropertyRow>>, TransportError> {
        let r: RowResponse = self.post(RequestBody::GetProps { flags, stat, tags })?;
        Ok(Reply::new(r.error_code, r.row))
    }

    fn query_rows(
        &mut self,
        flags: u32,
        stat: &Stat,
        table: &[u32],
        count: u32,
        columns: Option<&PropertyTagArray>,
    ) -> Result<Reply<Positioned<Option<PropertyRowSet>>>, TransportError> {
        let r: TableResponse = self.post(RequestBody::QueryRows {
            flags,
            stat,
            table,
            count,
            columns,
        })?;
        Ok(Reply::new(
            r.error_code,
            Positioned::new(r.stat, r.rows.map(|data| data.rows)),
        ))
    }

    fn seek_entries(
        &mut self,
        stat: &Stat,
        target: &PropertyValue,
        table: Option<&PropertyTagArray>,
        columns: Option<&PropertyTagArray>,
    ) -> Result<Reply<Positioned<Option<PropertyRowSet>>>, TransportError> {
        let r: TableResponse = self.post(RequestBody::SeekEntries {
            stat,
            target,
            table,
            columns,
        })?;
        Ok(Reply::new(
            r.error_code,
            Positioned::new(r.stat, r.rows.map(|data| data.rows)),
        ))
    }

    fn get_matches(
        &mut self,
        stat: &Stat,
        request: &GetMatchesRequest,
    ) -> Result<Reply<Positioned<MatchSet>>, TransportError> {
        let r: MatchesResponse = self.post(RequestBody::GetMatches { stat, request })?;
        Ok(Reply::new(
            r.error_code,
            Positioned::new(
                r.stat,
                MatchSet {
                    mids: r.mids,
                    rows: r.rows.map(|data| data.rows),
                },
            ),
        ))
    }

    fn resort_restriction(
        &mut self,
        stat: &Stat,
        mids: &PropertyTagArray,
    ) -> Result<Reply<Positioned<Option<PropertyTagArray>>>, TransportError> {
        let r: ResortResponse = self.post(RequestBody::ResortRestriction { stat, mids })?;
        Ok(Reply::new(r.error_code, Positioned::new(r.stat, r.mids)))
    }

    fn compare_mids(&mut self, stat: &Stat, mid1: u32, mid2: u32) -> Result<Reply<i32>, TransportError> {
        let r: CompareMidsResponse = self.post(RequestBody::CompareMids { stat, mid1, mid2 })?;
        Ok(Reply::new(r.error_code, r.result))
    }

    fn dn_to_mid(&mut self, names: &StringArray) -> Result<Reply<Option<PropertyTagArray>>, TransportError> {
        let r: TagsResponse = self.post(RequestBody::DnToMid { names })?;
        Ok(Reply::new(r.error_code, r.tags))
    }

    fn mod_props(
        &mut self,
        stat: &Stat,
        remove: Option<&PropertyTagArray>,
        row: &PropertyRow,
    ) -> Result<Reply<()>, TransportError> {
        let r: StatusResponse = self.post(RequestBody::ModProps { stat, remove, row })?;
        Ok(Reply::new(r.error_code, ()))
    }

    fn mod_link_att(
        &mut self,
        flags: u32,
        tag: PropertyTag,
        mid: u32,
        entry_ids: &BinaryArray,
    ) -> Result<Reply<()>, TransportError> {
        let r: StatusResponse = self.post(RequestBody::ModLinkAtt {
            flags,
            tag,
            mid,
            entry_ids,
        })?;
        Ok(Reply::new(r.error_code, ()))
    }

    fn resolve_names(
        &mut self,
        _stat: &Stat,
        _tags: Option<&PropertyTagArray>,
        _names: &StringArray,
    ) -> Result<Reply<MatchSet>, TransportError> {
        Err(TransportError::Unsupported {
            operation: Operation::ResolveNames,
        })
    }

    fn resolve_names_w(
        &mut self,
        stat: &Stat,
        tags: Option<&PropertyTagArray>,
        names: &WStringArray,
    ) -> Result<Reply<MatchSet>, TransportError> {
        let r: ResolveNamesResponse = self.post(RequestBody::ResolveNames { stat, tags, names })?;
        Ok(Reply::new(
            r.error_code,
            MatchSet {
                mids: r.mids,
                rows: r.rows.map(|data| data.rows),
            },
        ))
    }

    fn get_template_info(
        &mut self,
        flags: u32,
        display_type: u32,
        template_dn: Option<&str>,
        code_page: u32,
        locale: u32,
    ) -> Result<Reply<Option<PropertyRow>>, TransportError> {
        let r: RowResponse = self.post(RequestBody::GetTemplateInfo {
            flags,
            display_type,
            template_dn,
            code_page,
            locale,
        })?;
        Ok(Reply::new(r.error_code, r.row))
    }
}
