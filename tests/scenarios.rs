use protoshape::{
    Config, ConflictError, Diagnostic, EnumDescriptor, EnumValueDescriptor, FieldDescriptor,
    FieldKind, FileDescriptor, FullyQualifiedName, MemberSource, MessageDescriptor, OptionValue,
    Placement, Representation, ScalarKind, Shape, Type, VariantPayload,
};

use pretty_assertions::assert_eq;

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn ext(name: &str) -> String {
    format!("sebuf.http.{}", name)
}

#[test]
fn wrapper_from_another_file_collapses_inside_map() {
    init();
    let resolution = Config::new().resolve(vec![
        FileDescriptor::new("bar.proto", "demo")
            .imported()
            .message(MessageDescriptor::new("Bar").field(FieldDescriptor::new("id", 1, Type::String)))
            .message(
                MessageDescriptor::new("BarList").field(
                    FieldDescriptor::message("bars", 1, "Bar")
                        .repeated()
                        .option(ext("unwrap"), OptionValue::Bool(true)),
                ),
            ),
        FileDescriptor::new("response.proto", "demo").message(MessageDescriptor::new("Response").map_field(
            "bars",
            1,
            Type::String,
            Type::Message,
            Some(".demo.BarList"),
        )),
    ]);
    assert!(resolution.errors().is_empty());

    let plan = resolution.plan(&".demo.Response.bars".into()).unwrap();
    assert_eq!(
        plan.kind,
        FieldKind::Map(
            ScalarKind::String,
            Box::new(FieldKind::List(Box::new(FieldKind::Message(".demo.Bar".into()))))
        )
    );
    assert_eq!(plan.shape, Shape::Map);
    assert_eq!(plan.collapsed, Some(".demo.BarList".into()));

    let wrapper = resolution.plan_message_named(&".demo.BarList".into()).unwrap();
    assert_eq!(
        wrapper.representation,
        Representation::Unwrapped(FieldKind::List(Box::new(FieldKind::Message(
            ".demo.Bar".into()
        ))))
    );
}

#[test]
fn flattened_discriminated_union() {
    init();
    let login = MessageDescriptor::new("Login")
        .field(FieldDescriptor::new("user_agent", 1, Type::String))
        .oneof_field("auth", FieldDescriptor::message("email", 2, "Email"))
        .oneof_field("auth", FieldDescriptor::message("token", 3, "Token"));
    let mut file = FileDescriptor::new("auth.proto", "demo")
        .message(
            MessageDescriptor::new("Email")
                .field(FieldDescriptor::new("email", 1, Type::String))
                .field(FieldDescriptor::new("password", 2, Type::String)),
        )
        .message(MessageDescriptor::new("Token").field(FieldDescriptor::new("token", 1, Type::String)))
        .message(login);
    file.messages[2].oneofs[0].options.push(
        ext("oneof_config"),
        OptionValue::aggregate([
            ("discriminator", OptionValue::string("auth_method")),
            ("flatten", OptionValue::Bool(true)),
        ]),
    );

    let resolution = Config::new().resolve(vec![file]);
    assert!(resolution.validate_all().is_empty());

    let union = resolution
        .plan_oneof_named(&".demo.Login.auth".into())
        .unwrap()
        .expect("auth is discriminated");
    assert_eq!(union.type_name, "LoginAuth");
    assert_eq!(union.discriminator, "auth_method");
    assert_eq!(union.placement, Placement::Intersected);

    let branches = union
        .variants
        .iter()
        .map(|variant| {
            let members = match &variant.payload {
                VariantPayload::Flattened(members) => members
                    .iter()
                    .map(|member| (member.json_name.clone(), member.plan.shape))
                    .collect::<Vec<_>>(),
                other => panic!("expected a flattened payload, got {:?}", other),
            };
            (variant.literal.clone(), members)
        })
        .collect::<Vec<_>>();
    assert_eq!(
        branches,
        vec![
            (
                "email".to_string(),
                vec![
                    ("email".to_string(), Shape::Textual),
                    ("password".to_string(), Shape::Textual),
                ]
            ),
            ("token".to_string(), vec![("token".to_string(), Shape::Textual)]),
        ]
    );

    if let VariantPayload::Flattened(members) = &union.variants[1].payload {
        assert_eq!(
            members[0].source,
            MemberSource::Flattened {
                via: FullyQualifiedName::from(".demo.Login.token"),
                prefix: String::new(),
            }
        );
    }

    let message = resolution.plan_message_named(&".demo.Login".into()).unwrap();
    assert_eq!(message.representation, Representation::Intersection);
    assert_eq!(message.members.len(), 1);
    assert_eq!(message.members[0].json_name, "userAgent");
    assert_eq!(message.unions, vec![union]);
}

#[test]
fn enum_value_override_keeps_other_names() {
    init();
    let resolution = Config::new().resolve(vec![FileDescriptor::new("status.proto", "demo")
        .enumeration(
            EnumDescriptor::new("Status")
                .value(EnumValueDescriptor::new("STATUS_UNSPECIFIED", 0))
                .value(
                    EnumValueDescriptor::new("ACTIVE", 1)
                        .option(ext("enum_value"), OptionValue::string("active")),
                )
                .value(EnumValueDescriptor::new("INACTIVE", 2)),
        )
        .message(MessageDescriptor::new("User").field(FieldDescriptor::enumeration(
            "status",
            1,
            "Status",
        )))]);
    assert!(resolution.errors().is_empty());

    let plan = resolution.plan_enum_named(&".demo.Status".into()).unwrap();
    assert_eq!(plan.literal(1), Some("active"));
    assert_eq!(plan.literal(0), Some("STATUS_UNSPECIFIED"));
    assert_eq!(plan.literal(2), Some("INACTIVE"));

    let field = resolution.plan(&".demo.User.status".into()).unwrap();
    assert_eq!(field.shape, Shape::Textual);
}

#[test]
fn number_encoded_int64_is_a_diagnostic_not_an_error() {
    init();
    let resolution = Config::new().resolve(vec![FileDescriptor::new("counter.proto", "demo").message(
        MessageDescriptor::new("Counter").field(
            FieldDescriptor::new("count", 1, Type::Int64)
                .option(ext("int64_encoding"), OptionValue::ident("NUMBER"))
                .option(
                    ext("field_examples"),
                    OptionValue::List(vec![OptionValue::string("9007199254740993")]),
                ),
        ),
    )]);

    let plan = resolution.plan(&".demo.Counter.count".into()).unwrap();
    assert_eq!(plan.shape, Shape::Numeric);
    assert!(plan.precision_risk);

    assert!(resolution.validate_all().is_empty());
    assert!(resolution.errors().is_empty());
    assert_eq!(
        resolution.diagnostics(),
        &[Diagnostic::PrecisionRisk {
            element: ".demo.Counter.count".into(),
            unsafe_examples: vec!["9007199254740993".to_string()],
        }]
    );
}

#[test]
fn numeric_enum_with_value_override_conflicts_once() {
    init();
    let resolution = Config::new().resolve(vec![FileDescriptor::new("status.proto", "demo")
        .enumeration(
            EnumDescriptor::new("Status")
                .option(ext("enum_encoding"), OptionValue::ident("NUMBER"))
                .value(EnumValueDescriptor::new("STATUS_UNSPECIFIED", 0))
                .value(
                    EnumValueDescriptor::new("ACTIVE", 1)
                        .option(ext("enum_value"), OptionValue::string("x")),
                ),
        )]);

    assert_eq!(
        resolution.validate_all(),
        &[ConflictError::EnumEncodingConflict {
            element: ".demo.Status".into(),
            field: None,
        }]
    );
    let file = resolution.files_to_generate().next().unwrap();
    assert!(resolution.file_status(file).is_err());
}
