//! モデルアーカイブの確認用バイナリ
//!
//! Usage:
//!   inspect_model <model.tar.gz>
//!   inspect_model --write-untrained <model.tar.gz>

#[cfg(feature = "ml")]
fn main() {
    use digit_classifier_lib::ml::InferenceEngine;
    use digit_classifier_lib::model::{load_metadata, print_metadata_info, ModelMetadata};
    use digit_classifier_lib::{ClassifierAdapter, ModelInfo, NormalizedTensor};
    use std::path::PathBuf;

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: inspect_model <model.tar.gz> | --write-untrained <model.tar.gz>");
        std::process::exit(2);
    }

    // 未学習モデルの書き出し（アーカイブ形式の確認用）
    if args[1] == "--write-untrained" {
        let Some(path) = args.get(2) else {
            eprintln!("出力パスを指定してください");
            std::process::exit(2);
        };
        let engine = match InferenceEngine::untrained(ModelMetadata::mnist("Untrained CNN (random weights)")) {
            Ok(e) => e,
            Err(err) => {
                eprintln!("モデル初期化エラー: {:#}", err);
                std::process::exit(1);
            }
        };
        match engine.save(path) {
            Ok(written) => println!("✓ 未学習モデルを保存しました: {}", written.display()),
            Err(err) => {
                eprintln!("✗ 保存エラー: {:#}", err);
                std::process::exit(1);
            }
        }
        return;
    }

    let model_path = PathBuf::from(&args[1]);

    println!("Test 1: モデルメタデータ読み込み");
    match load_metadata(&model_path) {
        Ok(metadata) => {
            println!("✓ モデルメタデータ読み込み成功:");
            print_metadata_info(&metadata);
        }
        Err(e) => {
            eprintln!("✗ エラー: {:#}", e);
            std::process::exit(1);
        }
    }

    println!("\n{}\n", "=".repeat(50));

    println!("Test 2: 推論エンジン初期化");
    let engine = match InferenceEngine::load(&model_path) {
        Ok(e) => e,
        Err(err) => {
            eprintln!("✗ Error loading model: {:#}", err);
            std::process::exit(1);
        }
    };
    engine.config().print_info();
    println!("{:?}", ModelInfo::from_config(engine.config()));

    println!("\n{}\n", "=".repeat(50));

    println!("Test 3: 空入力と全面塗りつぶし入力");
    let adapter = ClassifierAdapter::new(engine);
    for (name, value) in [("blank", 0.0f32), ("filled", 1.0f32)] {
        let tensor = match NormalizedTensor::from_vec(vec![value; 28 * 28]) {
            Ok(t) => t,
            Err(err) => {
                eprintln!("✗ {}", err);
                continue;
            }
        };
        match adapter.predict(&tensor) {
            Ok(Some(result)) => {
                let label = adapter
                    .model()
                    .config()
                    .class_index_to_label(result.label as usize)
                    .unwrap_or("?");
                println!("  {} => {} ({:.2}%)", name, label, result.confidence * 100.0)
            }
            Ok(None) => println!("  {} => 予測なし（空入力）", name),
            Err(err) => println!("  {} => エラー: {}", name, err),
        }
    }
}

#[cfg(not(feature = "ml"))]
fn main() {
    println!("ML機能が有効化されていません");
}
