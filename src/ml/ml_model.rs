//! 機械学習モデルの共通定義
//!
//! 手書き数字分類用のCNNモデルと関連する設定を提供します。

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        Linear, LinearConfig, Relu,
    },
    tensor::{activation::softmax, backend::Backend, Tensor},
};

/// モデル設定
#[derive(Config, Debug)]
pub struct ModelConfig {
    /// 分類クラス数
    pub num_classes: usize,
    /// 入力画像サイズ（正方形）
    #[config(default = 28)]
    pub image_size: usize,
    /// 入力チャネル数
    #[config(default = 1)]
    pub channels: usize,
}

impl ModelConfig {
    /// Conv3後の特徴マップサイズ
    ///
    /// Conv (3x3, no padding): size -> size - 2
    /// Pool (2x2, stride 2): size -> size / 2（切り捨て）
    /// 28 -> 26 -> 13 -> 11 -> 5 -> 3
    pub fn feature_map_size(&self) -> Option<usize> {
        let after_conv1 = self.image_size.checked_sub(2)?;
        let after_pool1 = after_conv1 / 2;
        let after_conv2 = after_pool1.checked_sub(2)?;
        let after_pool2 = after_conv2 / 2;
        let feature_map_size = after_pool2.checked_sub(2)?;
        (feature_map_size > 0).then_some(feature_map_size)
    }

    /// モデルを初期化
    pub fn init<B: Backend>(&self, device: &B::Device) -> anyhow::Result<DigitClassifier<B>> {
        if self.num_classes == 0 || self.channels == 0 {
            anyhow::bail!(
                "モデル設定が不正です: classes={}, channels={}",
                self.num_classes,
                self.channels
            );
        }
        let feature_map_size = self.feature_map_size().ok_or_else(|| {
            anyhow::anyhow!("入力サイズが小さすぎます: {} (最小14x14が必要)", self.image_size)
        })?;

        // 特徴次元 d = 128チャネル * feature_map_size * feature_map_size
        let d = 128 * feature_map_size * feature_map_size;
        let d_half = d / 2;

        tracing::debug!(
            "[Model] 入力: {}x{}x{}, 特徴次元 d: {}, FC: {} -> {} -> {}",
            self.image_size,
            self.image_size,
            self.channels,
            d,
            d,
            d_half,
            self.num_classes
        );

        Ok(DigitClassifier {
            conv1: Conv2dConfig::new([self.channels, 32], [3, 3])
                .with_stride([1, 1])
                .init(device),
            pool1: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            conv2: Conv2dConfig::new([32, 64], [3, 3])
                .with_stride([1, 1])
                .init(device),
            pool2: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            conv3: Conv2dConfig::new([64, 128], [3, 3])
                .with_stride([1, 1])
                .init(device),
            fc1: LinearConfig::new(d, d_half).init(device),
            fc2: LinearConfig::new(d_half, self.num_classes).init(device),
            activation: Relu::new(),
        })
    }
}

/// 手書き数字分類用CNNモデル
///
/// # アーキテクチャ
/// - {Conv 3x3 + ReLU + MaxPool 2x2} x 2層
/// - Conv 3x3 + ReLU
/// - Flatten
/// - FC: d -> d/2 + ReLU
/// - FC: d/2 -> num_classes
/// - Softmax (推論時)
#[derive(Module, Debug)]
pub struct DigitClassifier<B: Backend> {
    conv1: Conv2d<B>,  // channels -> 32
    pool1: MaxPool2d,
    conv2: Conv2d<B>,  // 32 -> 64
    pool2: MaxPool2d,
    conv3: Conv2d<B>,  // 64 -> 128

    fc1: Linear<B>,    // d -> d/2
    fc2: Linear<B>,    // d/2 -> num_classes

    activation: Relu,
}

impl<B: Backend> DigitClassifier<B> {
    /// 順伝播
    ///
    /// # 引数
    /// - `images`: バッチ画像 [batch_size, channels, size, size]
    ///
    /// # 戻り値
    /// - クラスごとのロジット [batch_size, num_classes]
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        let [batch_size, _, _, _] = images.dims();

        let x = self.conv1.forward(images);
        let x = self.activation.forward(x);
        let x = self.pool1.forward(x);

        let x = self.conv2.forward(x);
        let x = self.activation.forward(x);
        let x = self.pool2.forward(x);

        let x = self.conv3.forward(x);
        let x = self.activation.forward(x);

        let [_, c, h, w] = x.dims();
        let x = x.reshape([batch_size, c * h * w]);

        let x = self.fc1.forward(x);
        let x = self.activation.forward(x);

        self.fc2.forward(x)
    }

    /// クラスごとの確率 [batch_size, num_classes]
    pub fn predict_proba(&self, images: Tensor<B, 4>) -> Tensor<B, 2> {
        softmax(self.forward(images), 1)
    }
}
