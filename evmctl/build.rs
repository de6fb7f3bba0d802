const SERIALIZABLE_RESPONSES: [&str; 6] = [
    ".ethermint.evm.v1.QueryStorageResponse",
    ".ethermint.evm.v1.QueryCodeResponse",
    ".ethermint.evm.v1.QueryParamsResponse",
    ".ethermint.evm.v1.QueryMappedEvmAddressResponse",
    ".ethermint.evm.v1.Params",
    ".ethermint.evm.v1.ChainConfig",
];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let builder = SERIALIZABLE_RESPONSES
        .iter()
        .fold(tonic_build::configure(), |builder, path| {
            builder.type_attribute(path, "#[derive(serde::Serialize)]")
        });

    builder
        .build_server(false)
        .extern_path(".google.protobuf.Any", "::cosmrs::Any")
        .field_attribute(
            ".ethermint.evm.v1.QueryCodeResponse.code",
            "#[serde(with = \"crate::printer::as_base64\")]",
        )
        // 64-bit integers are strings in the protobuf JSON mapping
        .field_attribute(
            ".ethermint.evm.v1.Params.extra_eips",
            "#[serde(with = \"serde_with::As::<Vec<serde_with::DisplayFromStr>>\")]",
        )
        .compile_protos(
            &[
                "proto/ethermint/evm/v1/query.proto",
                "proto/ethermint/evm/v1/tx.proto",
            ],
            &["proto", "proto/third_party"],
        )?;

    Ok(())
}
