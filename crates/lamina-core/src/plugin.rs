//! Batch driver over the protoc plugin protocol.
//!
//! One serialized `CodeGeneratorRequest` comes in, one serialized
//! `CodeGeneratorResponse` goes out. Each schema file in the batch is
//! processed independently: a file that fails its support check or records
//! emitter errors still contributes a response entry (possibly with an empty
//! body), and never suppresses generation for its siblings. The only fatal
//! condition is malformed framing at the protocol boundary.

use crate::error::Result;
use crate::gen::{self, Generator};
use crate::resolve::Backend;
use crate::schema::{file_stem, SchemaFile, TypeRegistry};
use bytes::BytesMut;
use prost::Message as _;
use prost_types::compiler::{
    code_generator_response::File as ResponseFile, CodeGeneratorRequest, CodeGeneratorResponse,
};
use std::collections::HashMap;
use std::io::{Read, Write};
use tracing::{debug, info, warn};

/// Parses the request's free-form parameter string.
///
/// Parameters are comma-separated `key=value` pairs; a bare `key` maps to an
/// empty value.
pub fn parse_parameters(parameter: &str) -> HashMap<String, String> {
    parameter
        .split(',')
        .filter(|part| !part.is_empty())
        .map(|part| match part.split_once('=') {
            Some((key, value)) => (key.to_string(), value.to_string()),
            None => (part.to_string(), String::new()),
        })
        .collect()
}

/// Runs one backend over one request, producing the batch response.
///
/// A fresh [`TypeRegistry`] is built for the run and discarded with it;
/// nothing is cached across runs.
pub fn generate(backend: Backend, request: &CodeGeneratorRequest) -> CodeGeneratorResponse {
    let generator = gen::for_backend(backend);
    let params = parse_parameters(request.parameter());
    let output_dir = params.get("output_dir").cloned().unwrap_or_default();

    let mut registry = TypeRegistry::new();
    let mut errors: Vec<String> = Vec::new();
    let mut files: Vec<ResponseFile> = Vec::new();

    let mut generated = 0usize;
    for proto in &request.proto_file {
        // protoc lists transitive dependencies too; only the requested
        // subset is generated. An empty subset means everything.
        if !request.file_to_generate.is_empty()
            && !request.file_to_generate.iter().any(|f| f == proto.name())
        {
            debug!("skipping {} (not in files to generate)", proto.name());
            continue;
        }

        let file_name = generator.file_name(file_stem(proto.name()), &output_dir);
        let (content, file_errors) = generate_file(generator.as_ref(), proto, &mut registry);
        if !file_errors.is_empty() {
            warn!(
                "{}: {} error(s) while generating {}",
                proto.name(),
                file_errors.len(),
                file_name
            );
        }
        errors.extend(file_errors);
        files.push(ResponseFile {
            name: Some(file_name),
            content: Some(content),
            ..Default::default()
        });
        generated += 1;
    }

    info!(
        "generated {} file(s) with backend '{}', {} error(s)",
        generated,
        backend.as_str(),
        errors.len()
    );

    CodeGeneratorResponse {
        error: if errors.is_empty() {
            None
        } else {
            Some(errors.join("\n"))
        },
        file: files,
        ..Default::default()
    }
}

/// Generates one file, isolating its failures.
fn generate_file(
    generator: &dyn Generator,
    proto: &prost_types::FileDescriptorProto,
    registry: &mut TypeRegistry,
) -> (String, Vec<String>) {
    let file = match SchemaFile::from_proto(proto) {
        Ok(file) => file,
        Err(err) => return (String::new(), vec![err.to_string()]),
    };
    registry.register_file(&file);

    let mut writer = crate::emit::CodeWriter::new();
    generator.write_file(&mut writer, &file, registry);
    writer.finish()
}

/// Decodes one request from `input`, generates, and encodes one response to
/// `output`.
///
/// Errors only on malformed request framing or boundary I/O; generator
/// errors are reported inside the response instead.
pub fn run(backend: Backend, input: &mut impl Read, output: &mut impl Write) -> Result<()> {
    let mut buf = Vec::new();
    input.read_to_end(&mut buf)?;
    let request = CodeGeneratorRequest::decode(buf.as_slice())?;
    debug!(
        "request: {} file(s), {} to generate",
        request.proto_file.len(),
        request.file_to_generate.len()
    );

    let response = generate(backend, &request);

    let mut out = BytesMut::with_capacity(response.encoded_len());
    response.encode(&mut out)?;
    output.write_all(&out)?;
    Ok(())
}
