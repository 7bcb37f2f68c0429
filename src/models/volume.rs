use ndarray::{Array3, ArrayView2, Axis};

/// 三维体数据，第 0 轴为切片（每次重复仿真一张），第 1/2 轴为行/列
#[derive(Debug, Clone, PartialEq)]
pub struct Volume {
    data: Array3<f32>,
}

impl Volume {
    pub fn new(data: Array3<f32>) -> Self {
        Self { data }
    }

    pub fn num_slices(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn rows(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn columns(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    /// 取出第 `index` 张切片
    pub fn slice(&self, index: usize) -> ArrayView2<'_, f32> {
        self.data.index_axis(Axis(0), index)
    }

    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }
}

/// 仿真器返回的三个体数据
#[derive(Debug, Clone)]
pub struct SimulationOutput {
    /// 重建图像（含模糊，开启噪声时含噪声）
    pub recon: Volume,
    /// 无噪声投影（正弦图）
    pub sinogram_noiseless: Volume,
    /// 无噪声、无模糊的真值图像
    pub ground_truth: Volume,
}
