use protoshape::{
    Config, ConflictError, EnumDescriptor, EnumValueDescriptor, Error, FieldDescriptor,
    FileDescriptor, FullyQualifiedName, HttpMethod, MessageDescriptor, MethodDescriptor,
    OptionValue, Resolution, ServiceDescriptor, ServiceId, Type,
};

use pretty_assertions::assert_eq;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn header(name: &str, required: bool) -> OptionValue {
    OptionValue::aggregate([
        ("name", OptionValue::string(name)),
        ("required", OptionValue::Bool(required)),
    ])
}

fn headers(entries: Vec<OptionValue>) -> OptionValue {
    OptionValue::aggregate([("required_headers", OptionValue::List(entries))])
}

fn http(path: &str, method: &str) -> OptionValue {
    OptionValue::aggregate([
        ("path", OptionValue::string(path)),
        ("method", OptionValue::ident(method)),
    ])
}

fn messages(file: FileDescriptor) -> FileDescriptor {
    file.message(
        MessageDescriptor::new("GetNoteRequest")
            .field(FieldDescriptor::new("note_id", 1, Type::String))
            .field(
                FieldDescriptor::new("revision", 2, Type::Int32)
                    .option("sebuf.http.query", OptionValue::aggregate([("name", OptionValue::string("rev"))])),
            ),
    )
    .message(
        MessageDescriptor::new("Note")
            .field(FieldDescriptor::new("note_id", 1, Type::String))
            .field(FieldDescriptor::new("body", 2, Type::String)),
    )
}

fn service_named(resolution: &Resolution, name: &str) -> ServiceId {
    let name = FullyQualifiedName::from(name);
    resolution
        .schema()
        .services()
        .find(|(_, service)| service.name == name)
        .map(|(id, _)| id)
        .unwrap()
}

#[test]
fn method_headers_extend_and_override_service_headers() {
    init();
    let resolution = Config::new().resolve(vec![messages(FileDescriptor::new("notes.proto", "notes"))
        .service(
            ServiceDescriptor::new("NoteService")
                .option(
                    "sebuf.http.service_headers",
                    headers(vec![header("X-Tenant", true), header("X-Client", false)]),
                )
                .method(
                    MethodDescriptor::new("GetNote", "GetNoteRequest", "Note").option(
                        "sebuf.http.method_headers",
                        headers(vec![header("X-Client", false), header("Authorization", true)]),
                    ),
                ),
        )]);
    assert!(resolution.validate_all().is_empty());

    let method = resolution
        .schema()
        .lookup_method(&".notes.NoteService.GetNote".into())
        .unwrap();
    let effective = resolution
        .effective_headers(method)
        .unwrap()
        .into_iter()
        .map(|header| (header.name, header.required))
        .collect::<Vec<_>>();
    assert_eq!(
        effective,
        vec![
            ("Authorization".to_string(), true),
            ("X-Client".to_string(), false),
            ("X-Tenant".to_string(), true),
        ]
    );
}

#[test]
fn narrowing_a_service_header_is_a_conflict() {
    init();
    let resolution = Config::new().resolve(vec![messages(FileDescriptor::new("notes.proto", "notes"))
        .service(
            ServiceDescriptor::new("NoteService")
                .option(
                    "sebuf.http.service_headers",
                    headers(vec![header("X-Client", false)]),
                )
                .method(
                    MethodDescriptor::new("GetNote", "GetNoteRequest", "Note").option(
                        "sebuf.http.method_headers",
                        headers(vec![header("X-Client", true)]),
                    ),
                ),
        )]);

    let conflicts = resolution.validate_all();
    assert_eq!(conflicts.len(), 1);
    match &conflicts[0] {
        ConflictError::HeaderRequirementConflict {
            element, header, ..
        } => {
            assert_eq!(element, &FullyQualifiedName::from(".notes.NoteService.GetNote"));
            assert_eq!(header, "X-Client");
        }
        other => panic!("unexpected conflict {:?}", other),
    }
}

#[test]
fn http_binding_splits_path_query_and_body() {
    init();
    let resolution = Config::new().resolve(vec![messages(FileDescriptor::new("notes.proto", "notes"))
        .service(
            ServiceDescriptor::new("NoteService")
                .option(
                    "sebuf.http.service_config",
                    OptionValue::aggregate([("base_path", OptionValue::string("notes/v1"))]),
                )
                .method(
                    MethodDescriptor::new("GetNote", "GetNoteRequest", "Note")
                        .option("sebuf.http.config", http("{note_id}", "HTTP_METHOD_GET")),
                )
                .method(
                    MethodDescriptor::new("SaveNote", "Note", "Note")
                        .option("sebuf.http.config", http("/{note_id}", "PUT")),
                ),
        )]);
    assert!(resolution.errors().is_empty());
    let method = |name: &str| resolution.schema().lookup_method(&name.into()).unwrap();

    let get = resolution
        .http_binding(method(".notes.NoteService.GetNote"))
        .unwrap();
    assert_eq!(get.method, HttpMethod::Get);
    assert_eq!(get.path, "/notes/v1/{note_id}");
    assert_eq!(get.path_params.len(), 1);
    assert_eq!(get.query_params.len(), 1);
    assert_eq!(get.query_params[0].name, "rev");
    assert_eq!(
        get.query_params[0].field,
        FullyQualifiedName::from(".notes.GetNoteRequest.revision")
    );
    assert!(get.body_fields.is_empty());

    let save = resolution
        .http_binding(method(".notes.NoteService.SaveNote"))
        .unwrap();
    assert_eq!(save.method, HttpMethod::Put);
    assert_eq!(save.path, "/notes/v1/{note_id}");
    assert_eq!(
        save.body_fields,
        vec![FullyQualifiedName::from(".notes.Note.body")]
    );
}

#[test]
fn failures_block_only_their_own_unit() {
    init();
    let broken_enum = FileDescriptor::new("status.proto", "notes").enumeration(
        EnumDescriptor::new("Status")
            .option("sebuf.http.enum_encoding", OptionValue::ident("NUMBER"))
            .value(
                EnumValueDescriptor::new("DRAFT", 0)
                    .option("sebuf.http.enum_value", OptionValue::string("draft")),
            ),
    );
    let services = messages(FileDescriptor::new("notes.proto", "notes"))
        .service(
            ServiceDescriptor::new("Broken")
                .option("sebuf.http.service_headers", headers(vec![header("X-Id", false)]))
                .method(
                    MethodDescriptor::new("Get", "GetNoteRequest", "Note")
                        .option("sebuf.http.method_headers", headers(vec![header("x-id", true)])),
                ),
        )
        .service(
            ServiceDescriptor::new("Healthy")
                .method(MethodDescriptor::new("Get", "GetNoteRequest", "Note")),
        );
    let resolution = Config::new().resolve(vec![broken_enum, services]);

    let rules = resolution
        .validate_all()
        .iter()
        .map(ConflictError::rule)
        .collect::<Vec<_>>();
    assert_eq!(rules, vec!["EnumEncodingConflict", "HeaderRequirementConflict"]);

    let files = resolution.files_to_generate().collect::<Vec<_>>();
    assert_eq!(files.len(), 2);
    match resolution.file_status(files[0]) {
        Err(errors) => assert!(matches!(
            errors.as_slice(),
            [Error::Conflict(ConflictError::EnumEncodingConflict { .. })]
        )),
        Ok(()) => panic!("status.proto must be blocked"),
    }

    let broken = service_named(&resolution, ".notes.Broken");
    let healthy = service_named(&resolution, ".notes.Healthy");
    assert!(resolution.service_status(broken).is_err());
    assert_eq!(resolution.service_status(healthy), Ok(()));
    let method = resolution
        .schema()
        .lookup_method(&".notes.Healthy.Get".into())
        .unwrap();
    assert_eq!(resolution.http_binding(method).unwrap().path, "/notes/get");
}
