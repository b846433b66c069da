use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use bytes::Bytes;
use nspi::client::{
    ClientConfig, ClientError, NspiClient, PositionField, PositionViolation, TransportKind,
};
use nspi::protocol::{
    BinaryArray, CP_WINUNICODE, ErrorCode, FlatUid, MID_END_OF_TABLE, Operation, PropertyRow,
    PropertyRowSet, PropertyTag, PropertyTagArray, PropertyValue, Stat, StringArray,
    TypedValue, WStringArray, WireEncode, WireWriter, PID_TAG_DISPLAY_NAME, PID_TAG_EMAIL_ADDRESS,
};
use nspi::transport::{
    BackendKind, BindResponse, CompareMidsResponse, ContextHandle, GetMatchesRequest,
    HttpConfig, HttpExchange, HttpRequest, HttpResponse, MatchSet, NspiBackend, Positioned,
    Reply, RpcChannel, SpecialTable, StatusResponse, TransportError, encode_response,
    frame_response,
};

enum Step {
    Status(u32),
    Fault(TransportError),
}

#[derive(Default)]
struct Log {
    calls: Vec<Operation>,
}

struct ScriptedBackend {
    kind: BackendKind,
    session: bool,
    opens_session: bool,
    script: VecDeque<Step>,
    returned_stat: Option<Stat>,
    log: Rc<RefCell<Log>>,
}

impl ScriptedBackend {
    fn new(kind: BackendKind) -> (Self, Rc<RefCell<Log>>) {
        let log = Rc::new(RefCell::new(Log::default()));
        let backend = Self {
            kind,
            session: false,
            opens_session: true,
            script: VecDeque::new(),
            returned_stat: None,
            log: Rc::clone(&log),
        };
        (backend, log)
    }

    fn script(mut self, steps: impl IntoIterator<Item = Step>) -> Self {
        self.script.extend(steps);
        self
    }

    fn without_session(mut self) -> Self {
        self.opens_session = false;
        self
    }

    fn returning_stat(mut self, stat: Stat) -> Self {
        self.returned_stat = Some(stat);
        self
    }

    fn step<T>(&mut self, operation: Operation, payload: T) -> Result<Reply<T>, TransportError> {
        self.log.borrow_mut().calls.push(operation);
        match self.script.pop_front().unwrap_or(Step::Status(0)) {
            Step::Status(status) => Ok(Reply::new(status, payload)),
            Step::Fault(err) => Err(err),
        }
    }

    fn positioned<T>(
        &mut self,
        operation: Operation,
        stat: &Stat,
        value: T,
    ) -> Result<Reply<Positioned<T>>, TransportError> {
        let returned = self.returned_stat.unwrap_or(*stat);
        self.step(operation, Positioned::new(Some(returned), value))
    }
}

impl NspiBackend for ScriptedBackend {
    fn kind(&self) -> BackendKind {
        self.kind
    }

    fn has_session(&self) -> bool {
        self.session
    }

    fn bind(
        &mut self,
        _flags: u32,
        _stat: &Stat,
        _server_guid: Option<FlatUid>,
    ) -> Result<Reply<Option<FlatUid>>, TransportError> {
        let reply = self.step(Operation::Bind, Some(FlatUid::from_bytes([7; 16])))?;
        self.session = self.opens_session && reply.status == 0;
        Ok(reply)
    }

    fn unbind(&mut self) -> Result<u32, TransportError> {
        self.session = false;
        self.step(Operation::Unbind, ()).map(|_| 1)
    }

    fn get_special_table(
        &mut self,
        _flags: u32,
        _stat: &Stat,
        version: u32,
    ) -> Result<Reply<SpecialTable>, TransportError> {
        self.step(
            Operation::GetSpecialTable,
            SpecialTable {
                version: Some(version + 1),
                rows: Some(PropertyRowSet::default()),
            },
        )
    }

    fn update_stat(
        &mut self,
        stat: &Stat,
        delta_requested: bool,
    ) -> Result<Reply<Positioned<Option<i32>>>, TransportError> {
        self.positioned(Operation::UpdateStat, stat, delta_requested.then_some(0))
    }

    fn query_columns(&mut self, _flags: u32) -> Result<Reply<Option<PropertyTagArray>>, TransportError> {
        self.step(
            Operation::QueryColumns,
            Some(PropertyTagArray::new(vec![PID_TAG_DISPLAY_NAME])),
        )
    }

    fn get_prop_list(
        &mut self,
        _flags: u32,
        _mid: u32,
        _code_page: u32,
    ) -> Result<Reply<Option<PropertyTagArray>>, TransportError> {
        self.step(Operation::GetPropList, None)
    }

    fn get_props(
        &mut self,
        _flags: u32,
        _stat: &Stat,
        _tags: Option<&PropertyTagArray>,
    ) -> Result<Reply<Option<PropertyRow>>, TransportError> {
        self.step(Operation::GetProps, None)
    }

    fn query_rows(
        &mut self,
        _flags: u32,
        stat: &Stat,
        _table: &[u32],
        _count: u32,
        _columns: Option<&PropertyTagArray>,
    ) -> Result<Reply<Positioned<Option<PropertyRowSet>>>, TransportError> {
        self.positioned(Operation::QueryRows, stat, Some(PropertyRowSet::default()))
    }

    fn seek_entries(
        &mut self,
        stat: &Stat,
        _target: &PropertyValue,
        _table: Option<&PropertyTagArray>,
        _columns: Option<&PropertyTagArray>,
    ) -> Result<Reply<Positioned<Option<PropertyRowSet>>>, TransportError> {
        self.positioned(Operation::SeekEntries, stat, None)
    }

    fn get_matches(
        &mut self,
        stat: &Stat,
        _request: &GetMatchesRequest,
    ) -> Result<Reply<Positioned<MatchSet>>, TransportError> {
        self.positioned(Operation::GetMatches, stat, MatchSet::default())
    }

    fn resort_restriction(
        &mut self,
        stat: &Stat,
        mids: &PropertyTagArray,
    ) -> Result<Reply<Positioned<Option<PropertyTagArray>>>, TransportError> {
        self.positioned(Operation::ResortRestriction, stat, Some(mids.clone()))
    }

    fn compare_mids(&mut self, _stat: &Stat, mid1: u32, mid2: u32) -> Result<Reply<i32>, TransportError> {
        self.step(Operation::CompareMids, mid1.cmp(&mid2) as i32)
    }

    fn dn_to_mid(&mut self, names: &StringArray) -> Result<Reply<Option<PropertyTagArray>>, TransportError> {
        let mids: Vec<u32> = (0..names.0.len()).map(|i| 0x100 + i as u32).collect();
        self.step(Operation::DnToMid, Some(PropertyTagArray::from_mids(&mids)))
    }

    fn mod_props(
        &mut self,
        _stat: &Stat,
        _remove: Option<&PropertyTagArray>,
        _row: &PropertyRow,
    ) -> Result<Reply<()>, TransportError> {
        self.step(Operation::ModProps, ())
    }

    fn mod_link_att(
        &mut self,
        _flags: u32,
        _tag: PropertyTag,
        _mid: u32,
        _entry_ids: &BinaryArray,
    ) -> Result<Reply<()>, TransportError> {
        self.step(Operation::ModLinkAtt, ())
    }

    fn resolve_names(
        &mut self,
        _stat: &Stat,
        _tags: Option<&PropertyTagArray>,
        _names: &StringArray,
    ) -> Result<Reply<MatchSet>, TransportError> {
        if self.kind == BackendKind::Http {
            self.log.borrow_mut().calls.push(Operation::ResolveNames);
            return Err(TransportError::Unsupported {
                operation: Operation::ResolveNames,
            });
        }
        self.step(Operation::ResolveNames, MatchSet::default())
    }

    fn resolve_names_w(
        &mut self,
        _stat: &Stat,
        _tags: Option<&PropertyTagArray>,
        _names: &WStringArray,
    ) -> Result<Reply<MatchSet>, TransportError> {
        self.step(Operation::ResolveNamesW, MatchSet::default())
    }

    fn get_template_info(
        &mut self,
        _flags: u32,
        _display_type: u32,
        _template_dn: Option<&str>,
        _code_page: u32,
        _locale: u32,
    ) -> Result<Reply<Option<PropertyRow>>, TransportError> {
        self.step(Operation::GetTemplateInfo, None)
    }
}

fn fast_config(kind: TransportKind) -> ClientConfig {
    ClientConfig::new(kind).with_wait_time(Duration::ZERO)
}

fn bound_client(backend: ScriptedBackend, config: ClientConfig) -> NspiClient {
    let mut client = NspiClient::from_backend(config, backend).unwrap();
    let outcome = client.bind(0, &Stat::new(), None).unwrap();
    assert!(outcome.is_success());
    client
}

fn calls(log: &Rc<RefCell<Log>>, operation: Operation) -> usize {
    log.borrow().calls.iter().filter(|op| **op == operation).count()
}

const GENERAL_FAILURE: u32 = 0x8000_4005;

#[test]
fn test_general_failure_retried_up_to_limit() {
    let (backend, log) = ScriptedBackend::new(BackendKind::Rpc);
    let backend = backend.script([
        Step::Status(0),
        Step::Status(GENERAL_FAILURE),
        Step::Status(GENERAL_FAILURE),
        Step::Status(GENERAL_FAILURE),
        Step::Status(GENERAL_FAILURE),
    ]);
    let mut client = bound_client(backend, fast_config(TransportKind::NcacnIpTcp));

    let outcome = client.compare_mids(&Stat::new(), 0x10, 0x11).unwrap();
    assert_eq!(outcome.status, ErrorCode::GeneralFailure);
    assert_eq!(outcome.attempts, 4);
    assert_eq!(calls(&log, Operation::CompareMids), 4);

    let metrics = client.metrics();
    assert_eq!(metrics.retries, 3);
    assert_eq!(metrics.transient_failures, 4);
}

#[test]
fn test_retry_recovers() {
    let (backend, log) = ScriptedBackend::new(BackendKind::Http);
    let backend = backend.script([
        Step::Status(0),
        Step::Fault(TransportError::Fault {
            code: GENERAL_FAILURE,
        }),
        Step::Status(0),
    ]);
    let mut client = bound_client(backend, fast_config(TransportKind::MapiHttp));

    let outcome = client.query_columns(0).unwrap();
    assert!(outcome.is_success());
    assert_eq!(outcome.attempts, 2);
    assert_eq!(outcome.value.unwrap().tags(), &[PID_TAG_DISPLAY_NAME]);
    assert_eq!(calls(&log, Operation::QueryColumns), 2);
}

#[test]
fn test_retry_disabled_attempts_once() {
    let (backend, log) = ScriptedBackend::new(BackendKind::Rpc);
    let backend = backend.script([Step::Status(0), Step::Status(GENERAL_FAILURE)]);
    let config = fast_config(TransportKind::NcacnHttp).with_retry_enabled(false);
    let mut client = bound_client(backend, config);

    let outcome = client.get_props(0, &Stat::new(), None).unwrap();
    assert_eq!(outcome.status, ErrorCode::GeneralFailure);
    assert_eq!(outcome.attempts, 1);
    assert_eq!(calls(&log, Operation::GetProps), 1);
}

#[test]
fn test_zero_retry_count_attempts_once() {
    let (backend, log) = ScriptedBackend::new(BackendKind::Rpc);
    let backend = backend.script([Step::Status(0), Step::Status(GENERAL_FAILURE)]);
    let config = fast_config(TransportKind::NcacnIpTcp).with_max_retry_count(0);
    let mut client = bound_client(backend, config);

    let outcome = client.get_prop_list(0, 0x20, CP_WINUNICODE).unwrap();
    assert_eq!(outcome.attempts, 1);
    assert_eq!(calls(&log, Operation::GetPropList), 1);
}

#[test]
fn test_other_statuses_not_retried() {
    let (backend, log) = ScriptedBackend::new(BackendKind::Rpc);
    let backend = backend.script([Step::Status(0), Step::Status(0x8004_010F)]);
    let mut client = bound_client(backend, fast_config(TransportKind::NcacnIpTcp));

    let outcome = client.get_props(0, &Stat::new(), None).unwrap();
    assert_eq!(outcome.status, ErrorCode::NotFound);
    assert_eq!(outcome.attempts, 1);
    assert_eq!(calls(&log, Operation::GetProps), 1);
}

#[test]
fn test_unknown_status_is_fatal() {
    let (backend, log) = ScriptedBackend::new(BackendKind::Rpc);
    let backend = backend.script([Step::Status(0), Step::Status(0x1234_5678)]);
    let mut client = bound_client(backend, fast_config(TransportKind::NcacnIpTcp));

    let err = client.compare_mids(&Stat::new(), 1, 2).unwrap_err();
    assert_eq!(
        err,
        ClientError::UnknownStatus {
            code: 0x1234_5678,
            operation: Operation::CompareMids,
        }
    );
    assert_eq!(calls(&log, Operation::CompareMids), 1);
    assert_eq!(client.metrics().unknown_statuses, 1);
}

#[test]
fn test_unmapped_fault_is_error() {
    let (backend, _log) = ScriptedBackend::new(BackendKind::Http);
    let backend = backend.script([
        Step::Status(0),
        Step::Fault(TransportError::HttpStatus { status: 500 }),
    ]);
    let mut client = bound_client(backend, fast_config(TransportKind::MapiHttp));

    let err = client.query_columns(0).unwrap_err();
    assert_eq!(
        err,
        ClientError::Transport(TransportError::HttpStatus { status: 500 })
    );
    assert_eq!(client.metrics().transport_faults, 1);
}

#[test]
fn test_codec_fault_surfaces_as_codec_error() {
    let (backend, _log) = ScriptedBackend::new(BackendKind::Rpc);
    let backend = backend.script([
        Step::Status(0),
        Step::Fault(TransportError::Codec(nspi::Error::TrailingBytes {
            field: "rpc.response",
            remaining: 3,
        })),
    ]);
    let mut client = bound_client(backend, fast_config(TransportKind::NcacnIpTcp));

    let err = client.query_columns(0).unwrap_err();
    assert_eq!(
        err,
        ClientError::Codec(nspi::Error::TrailingBytes {
            field: "rpc.response",
            remaining: 3,
        })
    );
    assert_eq!(client.metrics().transport_faults, 1);
}

#[test]
fn test_bind_without_session_rejected() {
    let (backend, _log) = ScriptedBackend::new(BackendKind::Http);
    let backend = backend.without_session();
    let mut client =
        NspiClient::from_backend(fast_config(TransportKind::MapiHttp), backend).unwrap();

    assert_eq!(
        client.bind(0, &Stat::new(), None).unwrap_err(),
        ClientError::Transport(TransportError::NoSession)
    );
    assert!(!client.is_bound());
    assert_eq!(client.query_columns(0).unwrap_err(), ClientError::NotBound);
}

#[test]
fn test_calls_require_bind() {
    let (backend, log) = ScriptedBackend::new(BackendKind::Rpc);
    let mut client =
        NspiClient::from_backend(fast_config(TransportKind::NcacnIpTcp), backend).unwrap();

    assert_eq!(client.query_columns(0).unwrap_err(), ClientError::NotBound);
    assert_eq!(client.unbind().unwrap_err(), ClientError::NotBound);
    assert!(log.borrow().calls.is_empty());
}

#[test]
fn test_double_bind_rejected() {
    let (backend, log) = ScriptedBackend::new(BackendKind::Rpc);
    let mut client = bound_client(backend, fast_config(TransportKind::NcacnIpTcp));

    assert_eq!(
        client.bind(0, &Stat::new(), None).unwrap_err(),
        ClientError::AlreadyBound
    );
    assert_eq!(calls(&log, Operation::Bind), 1);
    assert_eq!(client.server_guid(), Some(FlatUid::from_bytes([7; 16])));
}

#[test]
fn test_failed_bind_leaves_client_unbound() {
    let (backend, _log) = ScriptedBackend::new(BackendKind::Rpc);
    let backend = backend.script([Step::Status(ErrorCode::LogonFailed.as_u32())]);
    let mut client =
        NspiClient::from_backend(fast_config(TransportKind::NcacnIpTcp), backend).unwrap();

    let outcome = client.bind(0, &Stat::new(), None).unwrap();
    assert_eq!(outcome.status, ErrorCode::LogonFailed);
    assert!(!client.is_bound());
}

#[test]
fn test_unbind_reports_raw_code() {
    let (backend, log) = ScriptedBackend::new(BackendKind::Rpc);
    let mut client = bound_client(backend, fast_config(TransportKind::NcacnIpTcp));

    let outcome = client.unbind().unwrap();
    assert_eq!(outcome.code, 1);
    assert!(outcome.handle_cleared);
    assert!(!client.is_bound());
    assert_eq!(calls(&log, Operation::Unbind), 1);
}

#[test]
fn test_drop_unbinds() {
    let (backend, log) = ScriptedBackend::new(BackendKind::Rpc);
    let client = bound_client(backend, fast_config(TransportKind::NcacnIpTcp));
    drop(client);
    assert_eq!(calls(&log, Operation::Unbind), 1);
}

#[test]
fn test_transport_mismatch() {
    let (backend, _log) = ScriptedBackend::new(BackendKind::Http);
    let err = NspiClient::from_backend(fast_config(TransportKind::NcacnIpTcp), backend).unwrap_err();
    assert_eq!(
        err,
        ClientError::TransportMismatch {
            configured: TransportKind::NcacnIpTcp,
            backend: BackendKind::Http,
        }
    );
}

#[test]
fn test_stat_written_back() {
    let mut moved = Stat::new();
    moved.current_rec = 0x44;
    moved.num_pos = 5;
    moved.total_recs = 9;
    let (backend, _log) = ScriptedBackend::new(BackendKind::Rpc);
    let backend = backend.returning_stat(moved);
    let mut client = bound_client(backend, fast_config(TransportKind::NcacnIpTcp));

    let mut stat = Stat::new();
    let outcome = client.query_rows(0, &mut stat, &[], 10, None).unwrap();
    assert!(outcome.is_success());
    assert!(outcome.violations.is_empty());
    assert_eq!(stat, moved);
}

#[test]
fn test_violations_returned_with_payload() {
    let mut moved = Stat::new();
    moved.code_page = CP_WINUNICODE;
    moved.container_id = 0x30;
    moved.current_rec = MID_END_OF_TABLE;
    let (backend, _log) = ScriptedBackend::new(BackendKind::Rpc);
    let backend = backend.returning_stat(moved);
    let mut client = bound_client(backend, fast_config(TransportKind::NcacnIpTcp));

    let mut stat = Stat::new();
    let outcome = client.query_rows(0, &mut stat, &[], 10, None).unwrap();
    assert!(outcome.is_success());
    assert!(outcome.value.is_some());
    assert_eq!(outcome.violations.len(), 2);
    assert!(outcome.violations.contains(&PositionViolation::Changed {
        field: PositionField::ContainerId,
        before: 0,
        after: 0x30,
    }));
    assert_eq!(stat, moved);
    assert_eq!(client.metrics().position_violations, 2);
}

#[test]
fn test_get_matches_may_change_container() {
    let mut moved = Stat::new();
    moved.container_id = 0x30;
    let (backend, _log) = ScriptedBackend::new(BackendKind::Rpc);
    let backend = backend.returning_stat(moved);
    let mut client = bound_client(backend, fast_config(TransportKind::NcacnIpTcp));

    let mut stat = Stat::new();
    let outcome = client
        .get_matches(&mut stat, &GetMatchesRequest::default())
        .unwrap();
    assert!(outcome.violations.is_empty());
    assert_eq!(stat.container_id, 0x30);
}

#[test]
fn test_invalid_current_rec_flagged() {
    let mut moved = Stat::new();
    moved.current_rec = 0x07;
    let (backend, _log) = ScriptedBackend::new(BackendKind::Rpc);
    let backend = backend.returning_stat(moved);
    let mut client = bound_client(backend, fast_config(TransportKind::NcacnIpTcp));

    let mut stat = Stat::new();
    let target = PropertyValue::new(PID_TAG_EMAIL_ADDRESS, TypedValue::Unicode("B".into())).unwrap();
    let outcome = client.seek_entries(&mut stat, &target, None, None).unwrap();
    assert_eq!(
        outcome.violations,
        vec![PositionViolation::InvalidMid {
            field: PositionField::CurrentRec,
            value: 0x07,
        }]
    );
}

#[test]
fn test_http_resolve_names_not_supported() {
    let (backend, log) = ScriptedBackend::new(BackendKind::Http);
    let mut client = bound_client(backend, fast_config(TransportKind::MapiHttp));

    let names = StringArray(vec![b"alice".to_vec()]);
    let outcome = client.resolve_names(&Stat::new(), None, &names).unwrap();
    assert_eq!(outcome.status, ErrorCode::NotSupported);
    assert_eq!(outcome.attempts, 1);
    assert_eq!(outcome.value, MatchSet::default());
    assert_eq!(calls(&log, Operation::ResolveNames), 1);
}

#[test]
fn test_special_table_version_updated() {
    let (backend, _log) = ScriptedBackend::new(BackendKind::Rpc);
    let mut client = bound_client(backend, fast_config(TransportKind::NcacnIpTcp));

    let mut version = 4;
    let outcome = client
        .get_special_table(0, &Stat::new(), &mut version)
        .unwrap();
    assert!(outcome.is_success());
    assert_eq!(version, 5);
}

#[test]
fn test_remaining_operations_dispatch() {
    let (backend, log) = ScriptedBackend::new(BackendKind::Rpc);
    let mut client = bound_client(backend, fast_config(TransportKind::NcacnIpTcp));
    let mut stat = Stat::new();

    let delta = client.update_stat(&mut stat, true).unwrap();
    assert_eq!(delta.value, Some(0));

    let mids = client
        .dn_to_mid(&StringArray(vec![b"/o=a".to_vec(), b"/o=b".to_vec()]))
        .unwrap();
    assert_eq!(mids.value.unwrap().as_mids(), vec![0x100, 0x101]);

    let sorted = client
        .resort_restriction(&mut stat, &PropertyTagArray::from_mids(&[0x20, 0x10]))
        .unwrap();
    assert_eq!(sorted.value.unwrap().as_mids(), vec![0x20, 0x10]);

    let row = PropertyRow::new(vec![
        PropertyValue::new(PID_TAG_EMAIL_ADDRESS, TypedValue::Unicode("C".into())).unwrap(),
    ])
    .unwrap();
    assert!(client.mod_props(&stat, None, &row).unwrap().is_success());
    assert!(
        client
            .mod_link_att(0, PID_TAG_DISPLAY_NAME, 0x20, &BinaryArray(vec![vec![0; 4]]))
            .unwrap()
            .is_success()
    );
    assert!(
        client
            .resolve_names_w(&stat, None, &WStringArray(vec!["alice".into()]))
            .unwrap()
            .is_success()
    );
    assert!(
        client
            .get_template_info(0, 0, None, CP_WINUNICODE, 0x409)
            .unwrap()
            .is_success()
    );

    let order = client.compare_mids(&stat, 0x30, 0x20).unwrap();
    assert_eq!(order.value, 1);

    for op in [
        Operation::UpdateStat,
        Operation::DnToMid,
        Operation::ResortRestriction,
        Operation::ModProps,
        Operation::ModLinkAtt,
        Operation::ResolveNamesW,
        Operation::GetTemplateInfo,
        Operation::CompareMids,
    ] {
        assert_eq!(calls(&log, op), 1, "{op}");
    }
}

// End to end over the RPC marshaller with a fake channel.

#[derive(Default)]
struct FakeChannel {
    responses: VecDeque<Result<Bytes, TransportError>>,
    opnums: Rc<RefCell<Vec<u16>>>,
}

impl FakeChannel {
    fn push(&mut self, build: impl FnOnce(&mut WireWriter)) {
        let mut writer = WireWriter::new();
        build(&mut writer);
        self.responses.push_back(Ok(writer.finish()));
    }
}

impl RpcChannel for FakeChannel {
    fn invoke(&mut self, opnum: u16, _request: Bytes) -> Result<Bytes, TransportError> {
        self.opnums.borrow_mut().push(opnum);
        self.responses
            .pop_front()
            .unwrap_or(Err(TransportError::Io("script exhausted".into())))
    }
}

#[test]
fn test_rpc_channel_end_to_end() {
    let mut channel = FakeChannel::default();
    let opnums = Rc::clone(&channel.opnums);
    let handle = ContextHandle::new(0, uuid::Uuid::from_u128(0xfeed));

    channel.push(|w| {
        w.put_pointer(false);
        handle.encode_into(w).unwrap();
        w.put_u32(0);
    });
    channel
        .responses
        .push_back(Err(TransportError::Fault {
            code: GENERAL_FAILURE,
        }));
    channel.push(|w| {
        w.put_i32(-1);
        w.put_u32(0);
    });
    channel.push(|w| {
        ContextHandle::default().encode_into(w).unwrap();
        w.put_u32(1);
    });

    let mut client = NspiClient::new(
        fast_config(TransportKind::NcacnIpTcp),
        nspi::client::Channel::Rpc(Box::new(channel)),
    )
    .unwrap();

    assert!(client.bind(0, &Stat::new(), None).unwrap().is_success());
    let order = client.compare_mids(&Stat::new(), 0x10, 0x20).unwrap();
    assert_eq!(order.value, -1);
    assert_eq!(order.attempts, 2);

    let unbind = client.unbind().unwrap();
    assert_eq!(unbind.code, 1);
    assert!(unbind.handle_cleared);
    assert_eq!(*opnums.borrow(), vec![0, 10, 10, 1]);
}

#[test]
fn test_rpc_request_encode_failure_is_codec_error() {
    let mut channel = FakeChannel::default();
    let opnums = Rc::clone(&channel.opnums);
    let handle = ContextHandle::new(0, uuid::Uuid::from_u128(0xbeef));
    channel.push(|w| {
        w.put_pointer(false);
        handle.encode_into(w).unwrap();
        w.put_u32(0);
    });

    let mut client = NspiClient::new(
        fast_config(TransportKind::NcacnIpTcp),
        nspi::client::Channel::Rpc(Box::new(channel)),
    )
    .unwrap();
    assert!(client.bind(0, &Stat::new(), None).unwrap().is_success());

    let err = client
        .dn_to_mid(&StringArray(vec![b"a\0b".to_vec()]))
        .unwrap_err();
    assert_eq!(
        err,
        ClientError::Codec(nspi::Error::InteriorNul {
            field: "string_array.value",
        })
    );
    assert_eq!(*opnums.borrow(), vec![0]);
}

#[test]
fn test_rpc_bind_without_handle_leaves_client_unbound() {
    let mut channel = FakeChannel::default();
    channel.push(|w| {
        w.put_pointer(false);
        ContextHandle::default().encode_into(w).unwrap();
        w.put_u32(0);
    });

    let mut client = NspiClient::new(
        fast_config(TransportKind::NcacnIpTcp),
        nspi::client::Channel::Rpc(Box::new(channel)),
    )
    .unwrap();

    assert_eq!(
        client.bind(0, &Stat::new(), None).unwrap_err(),
        ClientError::Transport(TransportError::NoSession)
    );
    assert!(!client.is_bound());
}

// End to end over MAPI/HTTP with a fake exchanger.

#[derive(Default)]
struct FakeExchange {
    responses: VecDeque<HttpResponse>,
    requests: Rc<RefCell<Vec<HttpRequest>>>,
}

impl FakeExchange {
    fn reply(&mut self, body: Bytes, cookies: &[&str]) {
        let mut headers = vec![("X-ResponseCode".to_owned(), "0".to_owned())];
        headers.extend(
            cookies
                .iter()
                .map(|c| ("Set-Cookie".to_owned(), (*c).to_owned())),
        );
        self.responses.push_back(HttpResponse {
            status: 200,
            headers,
            body: frame_response(&[], &[], &body),
        });
    }
}

impl HttpExchange for FakeExchange {
    fn send(&mut self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        self.requests.borrow_mut().push(request.clone());
        self.responses
            .pop_front()
            .ok_or_else(|| TransportError::Io("script exhausted".into()))
    }
}

#[test]
fn test_http_exchange_end_to_end() {
    let mut exchange = FakeExchange::default();
    let requests = Rc::clone(&exchange.requests);

    let bind = BindResponse {
        error_code: 0,
        server_guid: FlatUid::from_bytes([9; 16]),
    };
    exchange.reply(encode_response(&bind).unwrap(), &["sid=abc; Path=/", "MapiContext=1"]);
    let cmp = CompareMidsResponse {
        error_code: 0,
        result: 1,
    };
    exchange.reply(encode_response(&cmp).unwrap(), &["sid=def"]);
    exchange.reply(
        encode_response(&StatusResponse { error_code: 0 }).unwrap(),
        &[],
    );

    let config = fast_config(TransportKind::MapiHttp)
        .with_http(HttpConfig::default().with_url("https://mail.example.com/mapi/nspi/"));
    let mut client = NspiClient::new(config, nspi::client::Channel::Http(Box::new(exchange))).unwrap();

    let bound = client.bind(0, &Stat::new(), None).unwrap();
    assert_eq!(bound.value, Some(FlatUid::from_bytes([9; 16])));

    let order = client.compare_mids(&Stat::new(), 0x20, 0x10).unwrap();
    assert_eq!(order.value, 1);

    let names = StringArray(vec![b"bob".to_vec()]);
    let unsupported = client.resolve_names(&Stat::new(), None, &names).unwrap();
    assert_eq!(unsupported.status, ErrorCode::NotSupported);

    let unbind = client.unbind().unwrap();
    assert_eq!(unbind.code, 0);
    assert!(unbind.handle_cleared);

    let requests = requests.borrow();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[0].url, "https://mail.example.com/mapi/nspi/");
    assert_eq!(requests[1].header("X-RequestType"), Some("CompareMIds"));
    assert_eq!(requests[1].header("Cookie"), Some("sid=abc; MapiContext=1"));
    assert_eq!(requests[2].header("X-RequestType"), Some("Unbind"));
    assert_eq!(requests[2].header("Cookie"), Some("sid=def"));
}
