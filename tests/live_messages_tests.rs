// Unit tests for the live endpoint wire types.

use mockview::live::messages::{
    Content, EmptyObject, GenerationConfig, MediaChunk, PrebuiltVoiceConfig, ServerMessage, Setup,
    SetupMessage, SpeechConfig, TextPart, VoiceConfig,
};

#[test]
fn test_server_content_deserializes() {
    let json = r#"{
        "serverContent": {
            "inputTranscription": { "text": "Hel" },
            "outputTranscription": { "text": "Hi" },
            "modelTurn": {
                "parts": [
                    { "inlineData": { "data": "AAAA", "mimeType": "audio/pcm;rate=24000" } }
                ]
            },
            "turnComplete": true,
            "interrupted": false
        }
    }"#;

    let message: ServerMessage = serde_json::from_str(json).expect("valid message");
    let content = message.server_content.expect("has content");

    assert_eq!(
        content.input_transcription.and_then(|t| t.text).as_deref(),
        Some("Hel")
    );
    assert_eq!(
        content.output_transcription.and_then(|t| t.text).as_deref(),
        Some("Hi")
    );
    assert_eq!(content.turn_complete, Some(true));
    assert_eq!(content.interrupted, Some(false));

    let turn = content.model_turn.expect("has model turn");
    let inline = turn.parts[0].inline_data.as_ref().expect("has audio");
    assert_eq!(inline.data, "AAAA");
    assert_eq!(inline.mime_type.as_deref(), Some("audio/pcm;rate=24000"));
}

#[test]
fn test_setup_complete_deserializes() {
    let message: ServerMessage =
        serde_json::from_str(r#"{ "setupComplete": {} }"#).expect("valid message");
    assert!(message.setup_complete.is_some());
    assert!(message.server_content.is_none());
}

#[test]
fn test_sparse_server_content_deserializes() {
    // Most messages carry only one of the optional fields.
    let message: ServerMessage =
        serde_json::from_str(r#"{ "serverContent": { "interrupted": true } }"#)
            .expect("valid message");
    let content = message.server_content.expect("has content");
    assert_eq!(content.interrupted, Some(true));
    assert!(content.model_turn.is_none());
    assert!(content.turn_complete.is_none());
}

#[test]
fn test_setup_message_serializes_expected_fields() {
    let setup = SetupMessage {
        setup: Setup {
            model: "models/gemini-2.0-flash-exp".to_string(),
            generation_config: GenerationConfig {
                response_modalities: vec!["AUDIO".to_string()],
                speech_config: SpeechConfig {
                    voice_config: VoiceConfig {
                        prebuilt_voice_config: PrebuiltVoiceConfig {
                            voice_name: "Puck".to_string(),
                        },
                    },
                },
            },
            system_instruction: Content {
                parts: vec![TextPart {
                    text: "You are an interviewer.".to_string(),
                }],
            },
            input_audio_transcription: Some(EmptyObject {}),
            output_audio_transcription: Some(EmptyObject {}),
        },
    };

    let json = serde_json::to_value(&setup).expect("serializes");

    assert_eq!(json["setup"]["model"], "models/gemini-2.0-flash-exp");
    assert_eq!(
        json["setup"]["generationConfig"]["responseModalities"][0],
        "AUDIO"
    );
    assert_eq!(
        json["setup"]["generationConfig"]["speechConfig"]["voiceConfig"]["prebuiltVoiceConfig"]
            ["voiceName"],
        "Puck"
    );
    assert_eq!(
        json["setup"]["systemInstruction"]["parts"][0]["text"],
        "You are an interviewer."
    );
    assert!(json["setup"]["inputAudioTranscription"].is_object());
    assert!(json["setup"]["outputAudioTranscription"].is_object());
}

#[test]
fn test_media_chunk_mime_types() {
    let audio = MediaChunk::pcm_audio("AAAA".to_string(), 16000);
    assert_eq!(audio.mime_type, "audio/pcm;rate=16000");

    let frame = MediaChunk::jpeg("/9j/4AAQ".to_string());
    assert_eq!(frame.mime_type, "image/jpeg");
}

#[test]
fn test_unknown_fields_are_ignored() {
    let message: ServerMessage = serde_json::from_str(
        r#"{ "serverContent": { "turnComplete": true, "groundingMetadata": {} }, "usageMetadata": {} }"#,
    )
    .expect("valid message");
    assert_eq!(
        message.server_content.and_then(|c| c.turn_complete),
        Some(true)
    );
}
